//! CLI commands for docweave: convert, check, and link or asset resolution.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use docweave::catalog;
use docweave::compiler::Compilation;
use docweave::config::Config;
use docweave::diagnostics::{self, Problem};
use docweave::error::Error;
use docweave::fallback::{FallbackRegistry, LinkableEntitiesResolver};
use docweave::lockfile::{LOCKFILE_NAME, LockEntry, Lockfile};
use docweave::output::{self, DEFAULT_OUTPUT_DIR};
use docweave::reference::{ResolutionResult, ResolvedReference, UnresolvedReference};
use docweave::resolver::ResolutionContext;

/// Exit code for a lockfile that no longer matches the sources.
const EXIT_STALE: u8 = 1;

/// Load config, inputs and external bundles, then build the graph.
///
/// # Errors
///
/// Returns errors from config loading, catalog loading, or reading an
/// external bundle's linkable entities.
fn load_project(root: &Path) -> Result<Compilation, Error> {
    let config = Config::load(root)?;
    let inputs = catalog::load(root, &config)?;

    let mut fallbacks = FallbackRegistry::new();
    for bundle in &config.external {
        let resolver =
            LinkableEntitiesResolver::load(&bundle.bundle_id, bundle.modules.clone(), &root.join(&bundle.entities))?
                .with_assets(bundle.assets.clone());
        fallbacks.register(Arc::new(resolver));
    }

    return Ok(Compilation::new(config, &inputs, fallbacks));
}

/// Output directory: the flag if given, otherwise the default under `root`.
fn output_dir(root: &Path, output: Option<PathBuf>) -> PathBuf {
    return output.unwrap_or_else(|| return root.join(DEFAULT_OUTPUT_DIR));
}

/// Build every page and write the output directory.
///
/// # Errors
///
/// Returns errors from project loading, compilation, or writing output.
pub fn convert(output: Option<PathBuf>) -> Result<ExitCode, Error> {
    let root = PathBuf::from(".");
    let dir = output_dir(&root, output);

    let result = load_project(&root)?.run()?;
    diagnostics::print_problems(&result.problems);
    output::write(&dir, &result)?;

    println!(
        "Wrote {} pages and {} references to {}",
        result.pages.len(),
        result.references.len(),
        dir.display()
    );
    return Ok(ExitCode::SUCCESS);
}

/// Rebuild and compare external references against the written lockfile.
///
/// # Errors
///
/// Returns errors from project loading, compilation, or lockfile reading.
pub fn check(output: Option<PathBuf>) -> Result<ExitCode, Error> {
    let root = PathBuf::from(".");
    let lock_path = output_dir(&root, output).join(LOCKFILE_NAME);

    let recorded = Lockfile::read(&lock_path)?;
    let result = load_project(&root)?.run()?;
    let current = result.lockfile()?;

    if current == recorded {
        let total = current.entries.len();
        println!("All {total} external references current");
        return Ok(ExitCode::SUCCESS);
    }

    for entry in &recorded.entries {
        match current.entries.iter().find(|e| return e.identifier == entry.identifier) {
            None => println!("REMOVED {}", entry.identifier),
            Some(now) if now != entry => println!("CHANGED {}", entry.identifier),
            Some(_) => {},
        }
    }
    for entry in &current.entries {
        if !contains(&recorded.entries, entry) {
            println!("ADDED   {}", entry.identifier);
        }
    }
    if recorded.checksum != current.checksum {
        println!();
        println!("checksum {} -> {}", recorded.checksum, current.checksum);
    }
    println!("run `docweave convert` to refresh {LOCKFILE_NAME}");
    return Ok(ExitCode::from(EXIT_STALE));
}

/// Whether `entries` has an entry for the same identifier.
fn contains(entries: &[LockEntry], entry: &LockEntry) -> bool {
    return entries.iter().any(|e| return e.identifier == entry.identifier);
}

/// Resolve one link as written on `from` (a canonical page path) or at the root.
///
/// # Errors
///
/// Returns `Error::MalformedReference` if the link does not parse,
/// `Error::UnknownPage` if `from` names no page, or project loading errors.
pub fn resolve(link: &str, from: Option<&str>) -> Result<ExitCode, Error> {
    let root = PathBuf::from(".");
    let compilation = load_project(&root)?;
    let graph = compilation.graph();

    let context = match from {
        None => ResolutionContext::root(),
        Some(path) => {
            let components = path.trim_matches('/').split('/').map(str::to_string).collect();
            let page = ResolvedReference::new(graph.bundle_id(), components);
            if graph.node(&page).is_none() {
                return Err(Error::UnknownPage { path: path.to_string() });
            }
            ResolutionContext::at(page)
        },
    };

    let reference = UnresolvedReference::parse(link)?;
    let resolver = compilation.resolver();
    return match resolver.resolve(&reference, &context) {
        ResolutionResult::Failure(failure) => {
            let page = context.referrer.as_ref().map(ResolvedReference::identifier);
            let problem = Problem::from_failure(&failure, page.unwrap_or_default());
            diagnostics::print_problems(&[problem]);
            Ok(ExitCode::FAILURE)
        },
        ResolutionResult::Success(resolved) => {
            let url = match graph.node(&resolved) {
                Some(node) => Some(node.url()),
                None => resolver.fallbacks().entity(&resolved).map(|e| return e.url.clone()),
            };
            println!("{resolved}");
            if let Some(url) = url {
                println!("{url}");
            }
            Ok(ExitCode::SUCCESS)
        },
    };
}

/// Look up a media asset by name in the external bundles and print its URL.
///
/// # Errors
///
/// Returns project loading errors.
pub fn resolve_asset(name: &str) -> Result<ExitCode, Error> {
    let root = PathBuf::from(".");
    let compilation = load_project(&root)?;
    return match compilation.resolver().fallbacks().asset(name) {
        Some(asset) => {
            println!("{}", asset.url);
            Ok(ExitCode::SUCCESS)
        },
        None => {
            eprintln!("error: no external bundle serves asset `{name}`");
            Ok(ExitCode::FAILURE)
        },
    };
}
