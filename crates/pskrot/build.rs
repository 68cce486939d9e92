// Renders `pskrot.1` and one `pskrot-<command>.1` per subcommand into
// `$OUT_DIR/man` for packaging.

use std::env;
use std::fs;
use std::io;
use std::path::Path;

use clap::CommandFactory;

// Shared with the binary. Only clap and clap_complete are needed to build it.
#[path = "src/cli.rs"]
mod cli;

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = env::var_os("OUT_DIR").ok_or_else(|| io::Error::other("OUT_DIR is not set"))?;
    let man_dir = Path::new(&out_dir).join("man");
    fs::create_dir_all(&man_dir)?;

    let pskrot = cli::Cli::command();
    write_man_page(&pskrot, &man_dir)?;

    // Subcommands are one level deep.
    for command in pskrot.get_subcommands().filter(|c| !c.is_hide_set()) {
        let page = command
            .clone()
            .name(format!("{}-{}", pskrot.get_name(), command.get_name()));
        write_man_page(&page, &man_dir)?;
    }
    Ok(())
}

fn write_man_page(command: &clap::Command, man_dir: &Path) -> io::Result<()> {
    let mut page = Vec::new();
    clap_mangen::Man::new(command.clone()).render(&mut page)?;
    fs::write(man_dir.join(format!("{}.1", command.get_name())), page)
}
