//! Handlers for the passgen subcommands.

use crate::cli::CliContext;
use crate::constants;
use crate::core::environment;
use crate::core::error::PassgenError;
use crate::core::store::{open_store, PasswordInfo, PasswordStore, RemoveOutcome, StoreTarget};
use crate::models::options::GenerationOptions;
use crate::util::prompt::TerminalPrompter;
use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};
use std::path::{Path, PathBuf};

fn parse_password_name(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("name cannot be empty".into());
    }
    if s.contains('/') {
        return Err("path separators are not allowed (use --folder)".into());
    }
    if s == "." || s == ".." {
        return Err("'.' and '..' are not password names".into());
    }
    if s.ends_with(constants::SALT_SUFFIX) || s.ends_with(constants::BACKUP_SUFFIX) {
        return Err(format!(
            "names ending in '{}' or '{}' are reserved for salts and backups",
            constants::SALT_SUFFIX,
            constants::BACKUP_SUFFIX
        ));
    }
    if s.chars().any(char::is_whitespace) {
        return Err("whitespace not allowed".into());
    }
    Ok(s.to_string())
}

/// Location selection shared by every password command.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Puppet environment
    #[arg(short, long = "env", value_name = "ENV", default_value = constants::DEFAULT_ENVIRONMENT)]
    pub environment: String,

    /// Legacy password directory (overrides environment lookup)
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// simpkv backend (simplib >= 4.0.0)
    #[arg(long, value_name = "NAME")]
    pub backend: Option<String>,

    /// simpkv folder (simplib >= 4.0.0)
    #[arg(long, value_name = "FOLDER")]
    pub folder: Option<String>,
}

impl TargetArgs {
    fn to_target(&self) -> StoreTarget {
        StoreTarget {
            environment: self.environment.clone(),
            dir: self.dir.clone(),
            backend: self.backend.clone(),
            folder: self.folder.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ListNamesArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Password names
    #[arg(required = true, value_parser = parse_password_name)]
    pub names: Vec<String>,

    /// Also show stored complexity settings and history depth
    #[arg(long)]
    pub details: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Password names
    #[arg(required = true, value_parser = parse_password_name)]
    pub names: Vec<String>,

    /// Generate passwords instead of prompting
    #[arg(long)]
    pub auto_gen: bool,

    /// Accept entered passwords without strength validation
    #[arg(long)]
    pub force_value: bool,

    /// Password length
    #[arg(long)]
    pub length: Option<usize>,

    /// Character classes for generated passwords (0-2)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=constants::MAX_COMPLEXITY as i64))]
    pub complexity: Option<u8>,

    /// Use only symbol characters for generated passwords
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_name = "BOOL")]
    pub complex_only: Option<bool>,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Password names
    #[arg(required = true, value_parser = parse_password_name)]
    pub names: Vec<String>,

    /// Remove without asking for confirmation
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

fn open(ctx: &CliContext, target: &TargetArgs) -> Result<Box<dyn PasswordStore>> {
    Ok(open_store(&ctx.config, &target.to_target(), TerminalPrompter)?)
}

pub fn run_list_environments(ctx: &CliContext) -> Result<()> {
    let path = Path::new(&ctx.config.puppet.environment_path);
    let envs = environment::list_environments(path)?;
    if envs.is_empty() {
        println!("No environments found in {}", path.display());
        return Ok(());
    }
    println!("Environments:");
    for env in envs {
        println!("  {}", env);
    }
    Ok(())
}

pub fn run_list_names(ctx: &CliContext, args: ListNamesArgs) -> Result<()> {
    let mut store = open(ctx, &args.target)?;
    let names = store.name_list()?;
    let folders = store.folder_list()?;
    println!("{} Names:", store.location());
    if names.is_empty() {
        println!("  (none)");
    }
    for name in names {
        println!("  {}", name);
    }
    if !folders.is_empty() {
        println!();
        println!("{} Sub-folders:", store.location());
        for folder in folders {
            println!("  {}", folder);
        }
    }
    Ok(())
}

pub fn render_show(location: &str, info: &[PasswordInfo], details: bool) -> String {
    let mut out = vec![format!("{} Passwords", location), "=".repeat(location.len() + 10)];
    for entry in info {
        out.push(String::new());
        out.push(format!("Name: {}", entry.name));
        out.push(format!("  Current:  {}", entry.current));
        if let Some(previous) = &entry.previous {
            out.push(format!("  Previous: {}", previous));
        }
        if let (true, Some(d)) = (details, entry.details) {
            let complexity = d
                .complexity
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let complex_only = d
                .complex_only
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            out.push(format!("  Complexity: {}", complexity));
            out.push(format!("  Complex only: {}", complex_only));
            out.push(format!("  History entries: {}", d.history_len));
        }
    }
    out.join("\n")
}

pub fn run_show(ctx: &CliContext, args: ShowArgs) -> Result<()> {
    let mut store = open(ctx, &args.target)?;
    let info = store.show(&args.names)?;
    println!("{}", render_show(&store.location(), &info, args.details));
    Ok(())
}

pub fn generation_options(ctx: &CliContext, args: &SetArgs) -> GenerationOptions {
    GenerationOptions {
        auto_gen: Some(args.auto_gen),
        force_value: Some(args.force_value),
        length: args.length,
        complexity: args.complexity,
        complex_only: args.complex_only,
        ..GenerationOptions::from_config(&ctx.config.generation)
    }
}

/// One row per requested name: `set`, or the failure reason.
pub fn status_table(names: &[String], failures: &[crate::core::error::PerNameFailure]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Name").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
    ]);
    for name in names {
        let status = failures
            .iter()
            .find(|f| &f.name == name)
            .map(|f| format!("FAILED: {}", f.reason))
            .unwrap_or_else(|| "set".to_string());
        table.add_row(vec![name.clone(), status]);
    }
    table
}

pub fn run_set(ctx: &CliContext, args: SetArgs) -> Result<()> {
    let options = generation_options(ctx, &args);
    let mut store = open(ctx, &args.target)?;
    println!("Setting passwords in {}", store.location());
    match store.set(&args.names, &options) {
        Ok(_) => {
            println!("{}", status_table(&args.names, &[]));
            Ok(())
        }
        Err(err @ PassgenError::Batch { .. }) => {
            println!("{}", status_table(&args.names, err.failures()));
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn run_remove(ctx: &CliContext, args: RemoveArgs) -> Result<()> {
    let mut store = open(ctx, &args.target)?;
    let outcomes = store.remove(&args.names, args.force)?;
    let removed = outcomes
        .iter()
        .filter(|(_, o)| matches!(o, RemoveOutcome::Removed { .. }))
        .count();
    println!(
        "Removed {} of {} passwords from {}",
        removed,
        args.names.len(),
        store.location()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PerNameFailure;
    use crate::core::store::RecordDetails;

    #[test]
    fn test_parse_password_name() {
        assert!(parse_password_name("db_admin").is_ok());
        assert!(parse_password_name("").is_err());
        assert!(parse_password_name("app/db").is_err());
        assert!(parse_password_name("..").is_err());
        assert!(parse_password_name(".").is_err());
        assert!(parse_password_name("a..b").is_ok());
        assert!(parse_password_name("db.last").is_err());
        assert!(parse_password_name("db.salt").is_err());
        assert!(parse_password_name("db.salty").is_ok());
        assert!(parse_password_name("a b").is_err());
    }

    #[test]
    fn test_render_show() {
        let info = vec![
            PasswordInfo {
                name: "db".into(),
                current: "now".into(),
                previous: Some("before".into()),
                details: Some(RecordDetails {
                    complexity: Some(1),
                    complex_only: Some(false),
                    history_len: 3,
                }),
            },
            PasswordInfo {
                name: "web".into(),
                current: "w".into(),
                previous: None,
                details: None,
            },
        ];
        let plain = render_show("'production' Environment", &info, false);
        assert!(plain.contains("Current:  now"));
        assert!(plain.contains("Previous: before"));
        assert!(!plain.contains("History entries"));
        assert_eq!(plain.matches("Previous:").count(), 1);

        let detailed = render_show("'production' Environment", &info, true);
        assert!(detailed.contains("Complexity: 1"));
        assert!(detailed.contains("History entries: 3"));
    }

    #[test]
    fn test_status_table() {
        let names = vec!["good1".to_string(), "bad1".to_string()];
        let failures = vec![PerNameFailure::new("bad1", "write failed")];
        let rendered = status_table(&names, &failures).to_string();
        assert!(rendered.contains("FAILED: write failed"));
        assert!(rendered.contains("good1"));
    }

    #[test]
    fn test_generation_options_from_flags() {
        let ctx = CliContext {
            config: Default::default(),
        };
        let args = SetArgs {
            names: vec!["db".into()],
            auto_gen: true,
            force_value: false,
            length: Some(20),
            complexity: None,
            complex_only: None,
            target: TargetArgs {
                environment: "production".into(),
                dir: None,
                backend: None,
                folder: None,
            },
        };
        let options = generation_options(&ctx, &args);
        assert_eq!(options.auto_gen, Some(true));
        assert_eq!(options.length, Some(20));
        assert_eq!(options.default_length, Some(constants::DEFAULT_PASSWORD_LENGTH));
        assert_eq!(options.default_complexity, Some(0));
    }
}
