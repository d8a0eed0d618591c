use clap::CommandFactory;
use clap_complete::{
    generate,
    shells::{Bash, Zsh},
};
use std::fs::File;
use std::path::PathBuf;

#[path = "src/cli.rs"]
#[allow(dead_code)]
mod cli;

fn main() {
    println!("cargo:rerun-if-changed=src/cli.rs");
    let Ok(out_dir) = std::env::var("OUT_DIR") else {
        return;
    };
    let completions_dir = PathBuf::from(out_dir).join("completions");
    let _ = std::fs::create_dir_all(&completions_dir);

    let mut cmd = cli::Cli::command();
    if let Ok(mut file) = File::create(completions_dir.join("yaml-config.bash")) {
        generate(Bash, &mut cmd, "yaml-config", &mut file);
    }

    let mut cmd = cli::Cli::command();
    if let Ok(mut file) = File::create(completions_dir.join("yaml-config.zsh")) {
        generate(Zsh, &mut cmd, "yaml-config", &mut file);
    }
}
