use stylerag_core::error::{Error, Result};
use stylerag_core::types::StyleKey;
use stylerag_pipeline::{DEFAULT_KNOWLEDGE, DEFAULT_TEMPERATURE, DEFAULT_WORDS};

pub const USAGE: &str = "Usage:
  stylerag ask <question> [--style S] [--temperature T] [--knowledge K] [--words N]
  stylerag provision <style|all>
  stylerag styles

Styles: email, normal, report, feedback";

#[derive(Debug, Clone, PartialEq)]
pub struct AskArgs {
    pub question: String,
    pub style: StyleKey,
    pub temperature: f32,
    pub knowledge: u8,
    pub words: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionTarget {
    All,
    One(StyleKey),
}

impl ProvisionTarget {
    pub fn styles(self) -> Vec<StyleKey> {
        match self {
            ProvisionTarget::All => StyleKey::ALL.to_vec(),
            ProvisionTarget::One(style) => vec![style],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ask(AskArgs),
    Provision(ProvisionTarget),
    Styles,
    Help,
}

/// Parse everything after the program name.
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some((cmd, rest)) = args.split_first() else { return Ok(Command::Help) };
    match cmd.as_str() {
        "ask" => parse_ask(rest).map(Command::Ask),
        "provision" => match rest {
            [target] if target.eq_ignore_ascii_case("all") => Ok(Command::Provision(ProvisionTarget::All)),
            [target] => Ok(Command::Provision(ProvisionTarget::One(target.parse()?))),
            _ => Err(Error::Configuration("provision takes exactly one style or 'all'".to_string())),
        },
        "styles" => Ok(Command::Styles),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(Error::Configuration(format!("unknown command '{}'", other))),
    }
}

fn parse_ask(args: &[String]) -> Result<AskArgs> {
    let mut words_of_question = Vec::new();
    let mut style = StyleKey::Normal;
    let mut temperature = DEFAULT_TEMPERATURE;
    let mut knowledge = DEFAULT_KNOWLEDGE;
    let mut words = DEFAULT_WORDS;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--style" | "-s" => style = value(args, i)?.parse()?,
            "--temperature" | "-t" => temperature = number(args, i)?,
            "--knowledge" | "-k" => knowledge = number(args, i)?,
            "--words" | "-w" => words = number(args, i)?,
            flag if flag.starts_with("--") => return Err(Error::Configuration(format!("unknown option '{}'", flag))),
            word => { words_of_question.push(word.to_string()); i += 1; continue; }
        }
        i += 2;
    }
    let question = words_of_question.join(" ");
    if question.trim().is_empty() {
        return Err(Error::Configuration("ask needs a non-empty question".to_string()));
    }
    Ok(AskArgs { question, style, temperature, knowledge, words })
}

fn value(args: &[String], i: usize) -> Result<&str> {
    args.get(i + 1).map(String::as_str).ok_or_else(|| Error::Configuration(format!("{} requires a value", args[i])))
}

fn number<T: std::str::FromStr>(args: &[String], i: usize) -> Result<T> {
    let raw = value(args, i)?;
    raw.parse().map_err(|_| Error::Configuration(format!("{} expects a number, got '{}'", args[i], raw)))
}
