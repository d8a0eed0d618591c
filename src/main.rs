use std::process::ExitCode;

fn main() -> ExitCode {
    yaml_configuration::cli_entrypoint()
}
