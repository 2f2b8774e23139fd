// build.rs

use clap::{Arg, ArgAction, ArgGroup, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("repose")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Repose Contributors")
        .about("Maintain a pacman repository database from a pool of package archives")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::Version)
                .help("Print version"),
        )
        .arg(
            Arg::new("update")
                .short('U')
                .long("update")
                .action(ArgAction::SetTrue)
                .help("Add or update packages from the pool"),
        )
        .arg(
            Arg::new("remove")
                .short('R')
                .long("remove")
                .action(ArgAction::SetTrue)
                .help("Remove packages from the database"),
        )
        .arg(
            Arg::new("query")
                .short('Q')
                .long("query")
                .action(ArgAction::SetTrue)
                .help("Print database entries"),
        )
        .arg(
            Arg::new("verify")
                .short('V')
                .long("verify")
                .action(ArgAction::SetTrue)
                .help("Check archives against the database"),
        )
        .group(
            ArgGroup::new("operation")
                .args(["update", "remove", "query", "verify"]),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("Show detailed package information when querying"),
        )
        .arg(
            Arg::new("pool")
                .short('p')
                .long("pool")
                .value_name("POOL")
                .help("Directory holding the package archives"),
        )
        .arg(
            Arg::new("clean")
                .short('c')
                .long("clean")
                .action(ArgAction::Count)
                .help("Delete superseded archives; repeat to also delete older ones"),
        )
        .arg(
            Arg::new("files")
                .short('f')
                .long("files")
                .action(ArgAction::SetTrue)
                .help("Also maintain the files database"),
        )
        .arg(
            Arg::new("arch")
                .short('a')
                .long("arch")
                .value_name("ARCH")
                .help("Repository architecture"),
        )
        .arg(
            Arg::new("sign")
                .short('s')
                .long("sign")
                .action(ArgAction::SetTrue)
                .help("Sign the database with GnuPG"),
        )
        .arg(
            Arg::new("key")
                .short('k')
                .long("key")
                .value_name("KEY")
                .help("GnuPG key to sign with"),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .value_name("MODE")
                .value_parser(["never", "always", "auto"])
                .default_value("auto")
                .help("Colorize section headers"),
        )
        .arg(
            Arg::new("rebuild")
                .long("rebuild")
                .action(ArgAction::SetTrue)
                .help("Ignore the existing database and rebuild from the pool"),
        )
        .arg(Arg::new("database").value_name("DATABASE").help("Path to the repository database"))
        .arg(
            Arg::new("targets")
                .value_name("TARGETS")
                .num_args(0..)
                .help("Package names, globs or archive paths"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("repose.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
