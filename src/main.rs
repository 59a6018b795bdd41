mod prompt;
mod wizard;

use crate::prompt::DialoguerPrompter;
use crate::wizard::Wizard;
use anyhow::Context;
use log::{error, info};
use sync_reviewers::{BitbucketRead, Failure, ServerConfig};

/// Exit code for panics and anything else that ends the run abnormally.
const UNCAUGHT_EXIT_CODE: i32 = 90;

enum Command {
    Run,
    Help,
    Version,
}

fn usage() {
    println!("Add or remove a default reviewer on many repositories of a Bitbucket project at once.");
    println!();
    println!("usage: {} [--help] [--version]", env!("CARGO_PKG_NAME"));
    println!("available flags:");
    println!("  -h, --help  Show this help message");
    println!("  --version   Show the version");
    println!("configuration (read from .env.local, or .env if missing):");
    println!("  bitbucket_url       Base url of the Bitbucket Server");
    println!("  bitbucket_user      User to authenticate as");
    println!("  bitbucket_password  Password or HTTP access token of that user");
    println!("  bitbucket_project   Key of the project to manage");
}

/// Unknown flags are dropped together with the value following them.
fn parse_args(mut args: impl Iterator<Item = String>) -> Command {
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Command::Help,
            "--version" => return Command::Version,
            _ => {
                args.next();
            }
        }
    }
    Command::Run
}

fn app() -> anyhow::Result<()> {
    match parse_args(std::env::args().skip(1)) {
        Command::Help => {
            usage();
            return Ok(());
        }
        Command::Version => {
            println!(
                "{} {} by {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_AUTHORS")
            );
            return Ok(());
        }
        Command::Run => {}
    }

    let dir = std::env::current_dir().context("failed to get the current directory")?;
    let config = ServerConfig::load(&dir)?;
    let bitbucket = sync_reviewers::connect(&config)?;

    let project = bitbucket.read.project(&config.project_key)?;
    info!("managing project '{}' ({})", project.name, project.key);
    let repos = bitbucket.read.repos(&project.key)?;
    info!("{} repositories found", repos.len());

    let mut wizard = Wizard::new(
        DialoguerPrompter::default(),
        &bitbucket.read,
        &bitbucket.write,
        &project,
        repos,
    );
    wizard.run()?;

    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Failure>())
        .map_or(1, Failure::exit_code)
}

/// Put the terminal back the way prompts found it.
fn restore_terminal() {
    let _ = console::Term::stderr().show_cursor();
}

fn main() {
    init_log();
    let code = match std::panic::catch_unwind(app) {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            error!("{}", err);
            for cause in err.chain().skip(1) {
                error!("caused by: {}", cause);
            }
            exit_code(&err)
        }
        Err(_) => UNCAUGHT_EXIT_CODE,
    };
    restore_terminal();
    std::process::exit(code);
}

fn init_log() {
    let mut env = env_logger::Builder::new();
    env.filter_module("default_reviewers", log::LevelFilter::Info);
    env.filter_module("sync_reviewers", log::LevelFilter::Info);
    if let Ok(content) = std::env::var("RUST_LOG") {
        env.parse_filters(&content);
    }
    env.init();
}
