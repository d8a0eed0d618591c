use crate::cli::{Cli, Command, GetArgs, SetArgs, ShowArgs, StoreArgs};
use crate::codec::{self, YamlStyle};
use crate::fs::{FileSystem, RealFileSystem};
use crate::paths::{self, PathArgError};
use crate::reconcile::ExemptKeys;
use crate::store::{ConfigStore, LoadOptions, LoadSource};
use serde_yaml::Value;
use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

pub struct Deps {
    fs: Arc<dyn FileSystem>,
}

impl Default for Deps {
    fn default() -> Self {
        Self::real()
    }
}

impl Deps {
    pub fn real() -> Self {
        Self {
            fs: Arc::new(RealFileSystem),
        }
    }

    pub fn with_fs(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}

#[derive(Debug)]
pub enum CliError {
    Message(String),
    Io(io::Error),
    Path(PathArgError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Message(message) => write!(f, "{}", message),
            CliError::Io(err) => write!(f, "{}", err),
            CliError::Path(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Message(_) => None,
            CliError::Io(err) => Some(err),
            CliError::Path(err) => Some(err),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        CliError::Io(value)
    }
}

impl From<PathArgError> for CliError {
    fn from(value: PathArgError) -> Self {
        CliError::Path(value)
    }
}

pub fn run(cli: Cli, deps: &Deps) -> Result<(), CliError> {
    let command = cli.command.unwrap_or(Command::Show(ShowArgs { json: false }));
    let mut store = open_store(&cli.store, deps)?;
    match command {
        Command::Get(args) => cmd_get(&store, args),
        Command::Set(args) => cmd_set(&mut store, args),
        Command::Keys => cmd_keys(&store),
        Command::Show(args) => cmd_show(&store, args),
        Command::Path => cmd_path(&store),
    }
}

pub fn exit_code_for(result: Result<(), CliError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn open_store(args: &StoreArgs, deps: &Deps) -> Result<ConfigStore, CliError> {
    let default_text = match args.defaults.as_deref() {
        Some(raw) => match paths::config_path_with(raw, deps.fs())? {
            Some(path) => deps.fs().read_to_string(&path).map_err(|err| {
                CliError::Message(format!(
                    "failed to read defaults at {}: {}",
                    path.display(),
                    err
                ))
            })?,
            None => String::new(),
        },
        None => String::new(),
    };
    let directory = match args.dir.as_deref() {
        Some(raw) => paths::config_path_with(raw, deps.fs())?,
        None => None,
    };

    let exempt = args.exempt.iter().fold(ExemptKeys::default(), |keys, raw| {
        keys.union(&ExemptKeys::from_value(&parse_cli_value(raw)))
    });
    let mut store = ConfigStore::new(default_text)
        .with_name(args.file.clone())
        .with_exempt_keys(&exempt)
        .with_fs(Box::new(Arc::clone(&deps.fs)));
    let options = LoadOptions {
        reconcile: !args.no_reconcile,
    };
    let report = store.load_with(&args.file, directory.as_deref(), options);
    if report.source == LoadSource::Unreadable {
        let path = store
            .target_dir()
            .map(|dir| dir.join(&args.file))
            .unwrap_or_else(|| PathBuf::from(&args.file));
        return Err(CliError::Message(format!(
            "could not read configuration at {}",
            path.display()
        )));
    }
    Ok(store)
}

fn cmd_get(store: &ConfigStore, args: GetArgs) -> Result<(), CliError> {
    let Some(value) = store.get(&args.key) else {
        return Err(CliError::Message(format!(
            "Config key not found: {}",
            args.key
        )));
    };
    println!("{}", render(value)?);
    Ok(())
}

fn cmd_set(store: &mut ConfigStore, args: SetArgs) -> Result<(), CliError> {
    let value = parse_cli_value(&args.value);
    store.set(args.key.clone(), value);
    if !store.save() {
        return Err(CliError::Message(format!(
            "failed to save configuration for key {}",
            args.key
        )));
    }
    println!("Updated config: {}", args.key);
    Ok(())
}

fn cmd_keys(store: &ConfigStore) -> Result<(), CliError> {
    for key in store.list_keys() {
        println!("{}", key);
    }
    Ok(())
}

fn cmd_show(store: &ConfigStore, args: ShowArgs) -> Result<(), CliError> {
    if args.json {
        let rendered = serde_json::to_string_pretty(store.active())
            .map_err(|err| CliError::Message(format!("Failed to render config: {}", err)))?;
        println!("{}", rendered);
        return Ok(());
    }
    let rendered = codec::to_yaml_string(store.active(), &YamlStyle::default())
        .map_err(|err| CliError::Message(format!("Failed to render config: {}", err)))?;
    print!("{}", rendered);
    Ok(())
}

fn cmd_path(store: &ConfigStore) -> Result<(), CliError> {
    match store.resolved_path() {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => Err(CliError::Message(
            "no configuration file could be created or read".to_string(),
        )),
    }
}

fn render(value: &Value) -> Result<String, CliError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        other => codec::render_value(other, &YamlStyle::default())
            .map_err(|err| CliError::Message(format!("Failed to render value: {}", err))),
    }
}

/// Values typed on the command line are read as YAML, so `5` is a number and
/// `[a, b]` a list. Anything that does not parse is kept as text.
fn parse_cli_value(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::String(raw.to_string());
    }
    codec::parse_document(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use std::path::Path;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("yaml-config").chain(args.iter().copied()))
    }

    fn write_defaults(dir: &Path) -> PathBuf {
        let path = dir.join("defaults.yaml");
        fs::write(&path, "retries: 3\nplugins: [core]\n").unwrap();
        path
    }

    #[test]
    fn parse_cli_value_reads_yaml_scalars_and_lists() {
        assert_eq!(parse_cli_value("5"), Value::from(5));
        assert_eq!(parse_cli_value("true"), Value::Bool(true));
        assert_eq!(
            parse_cli_value("[a, b]"),
            Value::Sequence(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(parse_cli_value(""), Value::from(""));
        assert_eq!(parse_cli_value("a: [b"), Value::from("a: [b"));
    }

    #[test]
    fn set_persists_value_with_reconciled_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let defaults = write_defaults(temp.path());
        let conf_dir = temp.path().join("conf");
        fs::create_dir(&conf_dir).unwrap();
        let defaults = defaults.to_string_lossy().to_string();
        let dir = conf_dir.to_string_lossy().to_string();

        run(
            cli(&["--defaults", defaults.as_str(), "--dir", dir.as_str(), "set", "retries", "7"]),
            &Deps::real(),
        )
        .unwrap();

        let written = fs::read_to_string(conf_dir.join("config.yaml")).unwrap();
        assert_eq!(written, "retries: 7\nplugins:\n    - core\n");
    }

    #[test]
    fn get_reports_missing_key() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().to_string_lossy().to_string();

        let err = run(cli(&["--dir", dir.as_str(), "get", "absent"]), &Deps::real()).unwrap_err();

        assert_eq!(err.to_string(), "Config key not found: absent");
    }

    #[test]
    fn missing_dir_argument_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing");
        let dir = missing.to_string_lossy().to_string();

        let err = run(cli(&["--dir", dir.as_str(), "keys"]), &Deps::real()).unwrap_err();

        assert!(matches!(err, CliError::Path(PathArgError::NotFound(path)) if path == missing));
    }

    #[test]
    fn unreadable_configuration_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("config.yaml"), "a: [broken\n").unwrap();
        let dir = temp.path().to_string_lossy().to_string();

        let err = run(cli(&["--dir", dir.as_str(), "show"]), &Deps::real()).unwrap_err();

        assert!(err.to_string().starts_with("could not read configuration at "));
    }

    #[test]
    fn exempt_flag_keeps_user_list() {
        let temp = tempfile::tempdir().unwrap();
        let defaults = write_defaults(temp.path());
        fs::write(temp.path().join("config.yaml"), "plugins: [mine]\n").unwrap();
        let defaults = defaults.to_string_lossy().to_string();
        let dir = temp.path().to_string_lossy().to_string();

        run(
            cli(&["--defaults", defaults.as_str(), "--dir", dir.as_str(), "--exempt", "plugins", "keys"]),
            &Deps::real(),
        )
        .unwrap();

        let written = fs::read_to_string(temp.path().join("config.yaml")).unwrap();
        assert_eq!(written, "plugins:\n    - mine\nretries: 3\n");
    }

    #[test]
    fn exempt_flag_accepts_yaml_list_and_ignores_other_shapes() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join("defaults.yaml"),
            "retries: 3\nplugins: [core]\nlimits:\n  cpu: 1\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("config.yaml"),
            "plugins: [mine]\nlimits:\n  mem: 2\n",
        )
        .unwrap();
        let defaults = temp.path().join("defaults.yaml").to_string_lossy().to_string();
        let dir = temp.path().to_string_lossy().to_string();

        run(
            cli(&[
                "--defaults",
                defaults.as_str(),
                "--dir",
                dir.as_str(),
                "--exempt",
                "[plugins, limits]",
                "--exempt",
                "{a: b}",
                "keys",
            ]),
            &Deps::real(),
        )
        .unwrap();

        let written = fs::read_to_string(temp.path().join("config.yaml")).unwrap();
        assert_eq!(
            written,
            "plugins:\n    - mine\nlimits:\n    mem: 2\nretries: 3\n"
        );
    }

    #[test]
    fn no_reconcile_flag_leaves_file_untouched() {
        let temp = tempfile::tempdir().unwrap();
        let defaults = write_defaults(temp.path());
        fs::write(temp.path().join("config.yaml"), "plugins: [mine]\n").unwrap();
        let defaults = defaults.to_string_lossy().to_string();
        let dir = temp.path().to_string_lossy().to_string();

        run(
            cli(&["--defaults", defaults.as_str(), "--dir", dir.as_str(), "--no-reconcile", "keys"]),
            &Deps::real(),
        )
        .unwrap();

        let written = fs::read_to_string(temp.path().join("config.yaml")).unwrap();
        assert_eq!(written, "plugins: [mine]\n");
    }

    #[test]
    fn render_uses_plain_text_for_strings_and_blocks_for_collections() {
        assert_eq!(render(&Value::from("hello world")).unwrap(), "hello world");
        let map: Value = serde_yaml::from_str("a: 1\nb: [x]\n").unwrap();
        assert_eq!(render(&map).unwrap(), "a: 1\nb:\n    - x");
    }
}
