use clap::{Args, Parser, Subcommand};

pub const DEFAULT_FILE_NAME: &str = "config.yaml";

const ROOT_AFTER_HELP: &str = r#"ENVIRONMENT:
  YAML_CONFIG_HOME    Config root used when --dir is omitted
  YAML_CONFIG_LOG     Log filter (default: warn)

EXAMPLES:
  yaml-config --defaults defaults.yaml show
  yaml-config --defaults defaults.yaml --dir ~/.config/myapp get window
  yaml-config --dir . --file app.yaml set retries 5
  yaml-config --defaults defaults.yaml --exempt plugins keys
"#;

#[derive(Parser, Debug)]
#[command(
    name = "yaml-config",
    version,
    about = "Load, reconcile and edit YAML configuration files",
    after_help = ROOT_AFTER_HELP
)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, global = true, value_name = "FILE", help = "YAML file with the default configuration")]
    pub defaults: Option<String>,
    #[arg(long, global = true, value_name = "DIR", help = "Directory holding the configuration file")]
    pub dir: Option<String>,
    #[arg(
        long,
        global = true,
        value_name = "NAME",
        default_value = DEFAULT_FILE_NAME,
        help = "Configuration file name"
    )]
    pub file: String,
    #[arg(
        long,
        global = true,
        value_name = "KEYS",
        help = "Top-level key, or YAML list of keys, never merged with defaults"
    )]
    pub exempt: Vec<String>,
    #[arg(long, global = true, help = "Do not fill in missing defaults")]
    pub no_reconcile: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Print a config value")]
    Get(GetArgs),
    #[command(about = "Set a config value and save")]
    Set(SetArgs),
    #[command(about = "List top-level keys")]
    Keys,
    #[command(about = "Print the whole configuration")]
    Show(ShowArgs),
    #[command(about = "Print the resolved configuration file path")]
    Path,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[arg(value_name = "KEY", help = "Config key")]
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[arg(value_name = "KEY", help = "Config key")]
    pub key: String,
    #[arg(value_name = "VALUE", help = "Config value (parsed as YAML)")]
    pub value: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[arg(long, help = "Print as JSON")]
    pub json: bool,
}
