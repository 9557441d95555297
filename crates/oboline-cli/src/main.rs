//! Oboline CLI
//!
//! Two entrypoints over the `oboline-core` loader:
//! - `check` parses OBO files, verifies required tags and resolves every
//!   cross-reference, reporting what it loaded;
//! - `rewrite` parses and re-serializes to canonical OBO text, which is the
//!   normalization step diff-based ontology review relies on.
//!
//! Both read stdin when no files are given, and both take the same policy
//! flags for grading recoverable conditions.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use oboline_core::{DeprecatedTagPolicy, Ontology, ResolutionPolicy, UnhandledTagPolicy};

#[derive(Parser)]
#[command(name = "oboline")]
#[command(author, version, about = "OBO ontology checker and rewriter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse OBO files, verify required tags and resolve all references.
    Check {
        #[command(flatten)]
        policies: PolicyArgs,
        /// Input files; stdin when none are given
        files: Vec<PathBuf>,
    },

    /// Parse OBO files and write them back in canonical form.
    ///
    /// Output is deterministic: fixed header and tag order, relation labels
    /// sorted with `is_a` first, resolved references annotated with the
    /// target's name.
    Rewrite {
        #[command(flatten)]
        policies: PolicyArgs,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Input files; stdin when none are given
        files: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct PolicyArgs {
    /// What to do with tags no reader recognizes
    #[arg(long = "unhandled-tags", value_enum, default_value = "fail")]
    unhandled: UnhandledArg,

    /// Diagnostic for deprecated tags
    #[arg(long = "deprecated-tags", value_enum, default_value = "warn")]
    deprecated: DeprecatedArg,

    /// Severity of references to unknown ids or relation types
    #[arg(long = "dangling-refs", value_enum, default_value = "fail")]
    dangling: ResolutionArg,

    /// Severity of references to obsolete stanzas
    #[arg(long = "obsolete-refs", value_enum, default_value = "fail")]
    obsolete: ResolutionArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnhandledArg {
    Fail,
    Warn,
    Record,
    WarnAndRecord,
    Ignore,
}

impl From<UnhandledArg> for UnhandledTagPolicy {
    fn from(arg: UnhandledArg) -> Self {
        match arg {
            UnhandledArg::Fail => UnhandledTagPolicy::Fail,
            UnhandledArg::Warn => UnhandledTagPolicy::Warn,
            UnhandledArg::Record => UnhandledTagPolicy::Record,
            UnhandledArg::WarnAndRecord => UnhandledTagPolicy::WarnAndRecord,
            UnhandledArg::Ignore => UnhandledTagPolicy::Ignore,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DeprecatedArg {
    Warn,
    Silent,
}

impl From<DeprecatedArg> for DeprecatedTagPolicy {
    fn from(arg: DeprecatedArg) -> Self {
        match arg {
            DeprecatedArg::Warn => DeprecatedTagPolicy::Warn,
            DeprecatedArg::Silent => DeprecatedTagPolicy::Silent,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ResolutionArg {
    Fail,
    Warn,
    Ignore,
    WarnAndIgnore,
}

impl From<ResolutionArg> for ResolutionPolicy {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::Fail => ResolutionPolicy::Fail,
            ResolutionArg::Warn => ResolutionPolicy::Warn,
            ResolutionArg::Ignore => ResolutionPolicy::Ignore,
            ResolutionArg::WarnAndIgnore => ResolutionPolicy::WarnAndIgnore,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { policies, files } => check(&files, &policies),
        Commands::Rewrite {
            policies,
            out,
            files,
        } => rewrite(&files, &policies, out.as_deref()),
    }
}

fn load(files: &[PathBuf], policies: &PolicyArgs) -> Result<Ontology> {
    let mut onto = Ontology::new();
    if files.is_empty() {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        onto.load_str(
            "<<stdin>>",
            &text,
            policies.unhandled.into(),
            policies.deprecated.into(),
        )?;
    } else {
        onto.load_files(files, policies.unhandled.into(), policies.deprecated.into())?;
    }
    Ok(onto)
}

fn check(files: &[PathBuf], policies: &PolicyArgs) -> Result<()> {
    let mut onto = load(files, policies)?;
    onto.check_required()?;
    onto.resolve_references(policies.dangling.into(), policies.obsolete.into())?;

    let stanzas = onto.user_stanzas().count();
    let terms = onto.terms().count();
    println!("ok: {stanzas} stanzas ({terms} terms)");
    Ok(())
}

fn rewrite(files: &[PathBuf], policies: &PolicyArgs, out: Option<&std::path::Path>) -> Result<()> {
    let mut onto = load(files, policies)?;
    onto.resolve_references(policies.dangling.into(), policies.obsolete.into())?;

    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            onto.write_obo(&mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            onto.write_obo(&mut handle)?;
        }
    }
    Ok(())
}
