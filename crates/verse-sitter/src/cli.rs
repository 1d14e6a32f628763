//! Command-line grammar load check.

use facet::Facet;
use std::process::ExitCode;
use verse_sitter::{
    verse, DirectoryProvider, EmbeddedProvider, Fallback, GrammarCheck, GrammarProvider, Loader,
};

const USAGE: &str = "\
Usage: verse-sitter [OPTIONS] <GRAMMAR>

Check that a grammar loads into a usable language handle.

Arguments:
  <GRAMMAR>               Name of the grammar to load, e.g. `verse`

Options:
      --grammar-dir <DIR>  Search DIR for grammar.json files before the embedded grammars
  -r, --rules              Print the grammar's rule names after loading it
  -v, --verbose            Log debug events to stderr
  -h, --help               Print this help
";

/// Check that a grammar loads into a usable language handle.
#[derive(Facet)]
struct Args {
    /// Name of the grammar to load, e.g. `verse`.
    #[facet(positional)]
    grammar: String,

    /// Directory to search for `grammar.json` files before the embedded grammars.
    #[facet(named, default)]
    grammar_dir: Option<String>,

    /// Print the grammar's rule names after loading it.
    #[facet(named, short = 'r', default)]
    rules: bool,

    /// Log debug events to stderr.
    #[facet(named, short = 'v', default)]
    verbose: bool,
}

fn main() -> ExitCode {
    if std::env::args()
        .skip(1)
        .any(|arg| arg == "-h" || arg == "--help")
    {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let args: Args = match facet_args::from_std_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    init_logging(args.verbose);

    let provider: Box<dyn GrammarProvider> = match &args.grammar_dir {
        Some(dir) => Box::new(Fallback::new(DirectoryProvider::new(dir), EmbeddedProvider)),
        None => Box::new(EmbeddedProvider),
    };
    let loader = Loader::new(provider);

    let label = if args.grammar == verse::NAME {
        verse::LABEL
    } else {
        args.grammar.as_str()
    };
    let mut check = GrammarCheck::new(label, args.grammar.as_str());

    match check.run(&loader) {
        Ok(language) => {
            println!(
                "loaded grammar '{}': {} rules, {} externals",
                language.name(),
                language.rule_count(),
                language.external_names().len()
            );
            if args.rules {
                for name in language.rule_names() {
                    println!("{name}");
                }
            }
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("{failure}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}
