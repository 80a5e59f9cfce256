use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Ddl,
    Init,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Ddl(DdlArgs),
    Init(InitArgs),
}

#[derive(Debug, Clone)]
pub struct DdlArgs {
    pub config: PathBuf,
    /// Only these tables (all when empty)
    pub tables: Vec<String>,
    pub prefix: Option<String>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct InitArgs {
    pub config: PathBuf,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" => Ok(Command::Help(HelpTopic::Root)),
        "ddl" => parse_ddl(it.map(|s| s.as_str())),
        "init" => parse_init(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

fn parse_ddl<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("dbforge.toml");
    let mut tables: Vec<String> = Vec::new();
    let mut prefix: Option<String> = None;
    let mut output: Option<PathBuf> = None;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Ddl)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--tables" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--tables requires a value");
                };
                tables = split_csv(v);
                if tables.is_empty() {
                    anyhow::bail!("--tables must not be empty");
                }
            }
            _ if token.starts_with("--tables=") => {
                tables = split_csv(token.trim_start_matches("--tables="));
                if tables.is_empty() {
                    anyhow::bail!("--tables must not be empty");
                }
            }
            "--prefix" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--prefix requires a value");
                };
                prefix = Some(v.to_string());
            }
            _ if token.starts_with("--prefix=") => {
                prefix = Some(token.trim_start_matches("--prefix=").to_string());
            }
            "--output" | "-o" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--output requires a value");
                };
                output = Some(PathBuf::from(v));
            }
            _ if token.starts_with("--output=") => {
                output = Some(PathBuf::from(token.trim_start_matches("--output=")));
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Ddl(DdlArgs {
        config,
        tables,
        prefix,
        output,
    }))
}

fn parse_init<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("dbforge.toml");

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Init)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Init(InitArgs { config }))
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
dbforge - render MySQL DDL from a schema file

USAGE:
  dbforge <COMMAND> [OPTIONS]

COMMANDS:
  ddl           Print CREATE TABLE statements for the schema
  init          Write a starter schema file

Run `dbforge <command> --help` for more."
            );
        }
        HelpTopic::Ddl => {
            println!(
                "\
USAGE:
  dbforge ddl [OPTIONS]

OPTIONS:
  --config <FILE>       Schema file path (default: dbforge.toml)
  --tables <CSV>        Only render these tables
  --prefix <PREFIX>     Override the table prefix from the schema file
  -o, --output <FILE>   Write to a file instead of stdout
  -h, --help            Print help"
            );
        }
        HelpTopic::Init => {
            println!(
                "\
USAGE:
  dbforge init [OPTIONS]

OPTIONS:
  --config <FILE>       Output schema path (default: dbforge.toml)
  -h, --help            Print help"
            );
        }
    }
}
