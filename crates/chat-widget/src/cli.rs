use thiserror::Error;

pub const DEFAULT_RELAY_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub relay_url: String,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut relay_url = DEFAULT_RELAY_URL.to_string();

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--url" => {
                    relay_url = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                }
                unknown => return Err(CliError::UnknownArgument(unknown.to_string())),
            }
        }

        Ok(Self { relay_url })
    }
}

/// A line typed at the terminal prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Clear,
    Chip(usize),
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "/quit" | "/exit" => Self::Quit,
            "/clear" => Self::Clear,
            _ => match trimmed.strip_prefix("/chip ").map(str::trim) {
                Some(index) => match index.parse::<usize>() {
                    Ok(index) if index > 0 => Self::Chip(index - 1),
                    _ => Self::Send(line.to_string()),
                },
                None => Self::Send(line.to_string()),
            },
        }
    }
}
