//! binder - assemble an EPUB directory from content files

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use bindery::metadata::is_marc_relator;
use bindery::{Collection, CollectionType, Container, ContainerOptions, Creator, Orientation};

#[derive(Parser)]
#[command(name = "binder")]
#[command(version, about = "Assemble an EPUB 3 package from content files", long_about = None)]
#[command(after_help = "EXAMPLES:
    binder -T 'The Plastic Age' -C 'Percy Marks' --role aut ch*.xhtml cover.png
    binder -b src -o book.epub src/text/*.xhtml src/css/style.css
    binder --list art/cover.jpg:images/cover.jpg @chapters.txt")]
struct Cli {
    /// Content files, as SOURCE or SOURCE:LOCAL. @FILE reads arguments
    /// from FILE, one per line; a lone @ reads them from stdin
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<String>,

    /// The output path
    #[arg(short, long, default_value = "untitled.epub")]
    output: PathBuf,

    /// Remove an existing output before writing
    #[arg(short, long)]
    force: bool,

    /// The title of the publication
    #[arg(short = 'T', long)]
    title: Option<String>,

    /// A creator of the publication (repeatable)
    #[arg(short = 'C', long, action = ArgAction::Append)]
    creator: Vec<String>,

    /// Sort string for the preceding creator, usually "last, first"
    #[arg(long, action = ArgAction::Append)]
    file_as: Vec<String>,

    /// MARC relator code of the preceding creator (e.g. aut)
    #[arg(long, action = ArgAction::Append, value_parser = parse_role)]
    role: Vec<String>,

    /// A collection the publication belongs to (repeatable)
    #[arg(long, action = ArgAction::Append)]
    collection: Vec<String>,

    /// Position of the publication within the preceding collection
    #[arg(long, action = ArgAction::Append)]
    issue: Vec<String>,

    /// The preceding collection is a complete set
    #[arg(long, action = ArgAction::Append, num_args = 0, default_missing_value = "true")]
    set: Vec<bool>,

    /// The preceding collection is an ongoing series
    #[arg(long, action = ArgAction::Append, num_args = 0, default_missing_value = "true")]
    series: Vec<bool>,

    /// The publication identifier (default: a fresh urn:uuid)
    #[arg(short = 'I', long)]
    identifier: Option<String>,

    /// The language of the publication (default: en-US)
    #[arg(short = 'L', long)]
    language: Option<String>,

    /// A description of the publication; @FILE reads it from FILE
    #[arg(short = 'D', long)]
    description: Option<String>,

    /// Stylesheet linked from the table of contents, relative to Contents/
    #[arg(long, value_name = "PATH")]
    toc_stylesheet: Option<PathBuf>,

    /// Prefer landscape orientation
    #[arg(long, conflicts_with = "portrait")]
    landscape: bool,

    /// Prefer portrait orientation
    #[arg(long)]
    portrait: bool,

    /// Use a fixed layout instead of reflowable text
    #[arg(long)]
    pre_paginated: bool,

    /// Directory the local names of the inputs are relative to
    #[arg(short, long, value_name = "DIR")]
    basedir: Option<PathBuf>,

    /// Do not include the table of contents in the reading order
    #[arg(long)]
    omit_toc: bool,

    /// Print the planned manifest as JSON instead of writing
    #[arg(long)]
    list: bool,

    /// More log output (repeatable)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn parse_role(s: &str) -> Result<String, String> {
    if is_marc_relator(s) {
        Ok(s.to_string())
    } else {
        Err("MARC roles are three lowercase letters".to_string())
    }
}

fn main() -> ExitCode {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let (creators, collections) = refinements(&matches).unwrap_or_else(|e| e.exit());

    init_tracing(cli.verbose, cli.quiet);

    match run(&cli, creators, collections) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, 2) => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// One creator or collection option, in command-line order.
enum Occurrence<'a> {
    Creator(&'a str),
    FileAs(&'a str),
    Role(&'a str),
    Collection(&'a str),
    Issue(&'a str),
    Set,
    Series,
}

/// Rebuild creators and collections from the interleaved options.
///
/// `--file-as`/`--role` refine the most recent `--creator`;
/// `--issue`/`--set`/`--series` refine the most recent `--collection`.
fn refinements(matches: &ArgMatches) -> Result<(Vec<Creator>, Vec<Collection>), clap::Error> {
    let mut seen: Vec<(usize, Occurrence<'_>)> = Vec::new();
    seen.extend(values(matches, "creator").map(|(i, v)| (i, Occurrence::Creator(v))));
    seen.extend(values(matches, "file_as").map(|(i, v)| (i, Occurrence::FileAs(v))));
    seen.extend(values(matches, "role").map(|(i, v)| (i, Occurrence::Role(v))));
    seen.extend(values(matches, "collection").map(|(i, v)| (i, Occurrence::Collection(v))));
    seen.extend(values(matches, "issue").map(|(i, v)| (i, Occurrence::Issue(v))));
    seen.extend(flags(matches, "set").map(|i| (i, Occurrence::Set)));
    seen.extend(flags(matches, "series").map(|i| (i, Occurrence::Series)));
    seen.sort_by_key(|(i, _)| *i);

    let mut creators: Vec<Creator> = Vec::new();
    let mut collections: Vec<Collection> = Vec::new();

    for (_, occurrence) in seen {
        match occurrence {
            Occurrence::Creator(name) => creators.push(Creator::new(name)),
            Occurrence::FileAs(file_as) => {
                let creator = creators
                    .last_mut()
                    .ok_or_else(|| usage("--file-as must follow a --creator"))?;
                creator.file_as = Some(file_as.to_string());
            }
            Occurrence::Role(role) => {
                let creator = creators
                    .last_mut()
                    .ok_or_else(|| usage("--role must follow a --creator"))?;
                creator.role = Some(role.to_string());
            }
            Occurrence::Collection(name) => collections.push(Collection::new(name)),
            Occurrence::Issue(position) => {
                let collection = collections
                    .last_mut()
                    .ok_or_else(|| usage("--issue must follow a --collection"))?;
                collection.group_position = Some(position.to_string());
            }
            Occurrence::Set => set_type(&mut collections, "--set", CollectionType::Set)?,
            Occurrence::Series => set_type(&mut collections, "--series", CollectionType::Series)?,
        }
    }

    Ok((creators, collections))
}

fn set_type(
    collections: &mut [Collection],
    flag: &str,
    kind: CollectionType,
) -> Result<(), clap::Error> {
    let collection = collections
        .last_mut()
        .ok_or_else(|| usage(&format!("{flag} must follow a --collection")))?;
    if collection.collection_type != CollectionType::Unspecified {
        return Err(usage("collection types are specified once"));
    }
    collection.collection_type = kind;
    Ok(())
}

fn values<'a>(matches: &'a ArgMatches, id: &str) -> impl Iterator<Item = (usize, &'a str)> {
    let indices = matches.indices_of(id).into_iter().flatten();
    let values = matches
        .get_many::<String>(id)
        .into_iter()
        .flatten()
        .map(String::as_str);
    indices.zip(values)
}

/// Positions of a value-less flag, one per occurrence.
fn flags<'a>(matches: &'a ArgMatches, id: &str) -> impl Iterator<Item = usize> + 'a {
    matches.indices_of(id).into_iter().flatten()
}

fn usage(message: &str) -> clap::Error {
    Cli::command().error(ErrorKind::ArgumentConflict, message)
}

fn run(cli: &Cli, creators: Vec<Creator>, collections: Vec<Collection>) -> Result<(), String> {
    let mut container = Container::with_options(ContainerOptions {
        omit_toc: cli.omit_toc,
    });

    let metadata = container.package_mut().metadata_mut();
    if let Some(title) = &cli.title {
        metadata.set_title(title.as_str());
    }
    if let Some(identifier) = &cli.identifier {
        metadata
            .set_identifier(identifier.as_str())
            .map_err(|e| e.to_string())?;
    }
    if let Some(language) = &cli.language {
        metadata.set_language(language.as_str());
    }
    if let Some(description) = &cli.description {
        metadata.set_description(read_description(description)?);
    }
    *metadata.creators_mut() = creators;
    *metadata.collections_mut() = collections;
    if cli.pre_paginated {
        metadata.set_pre_paginated();
    }
    if cli.landscape {
        metadata.set_orientation(Orientation::Landscape);
    } else if cli.portrait {
        metadata.set_orientation(Orientation::Portrait);
    }

    for arg in expand_inputs(&cli.inputs)? {
        let (source, local) = split_input(&arg, cli.basedir.as_deref())?;
        container.add(&source, &local).map_err(|e| e.to_string())?;
    }

    if let Some(stylesheet) = &cli.toc_stylesheet {
        container.set_toc_stylesheet(stylesheet.clone());
    }

    if cli.list {
        return print_listing(&container);
    }

    if cli.force {
        remove_output(&cli.output)?;
    }
    container.write(&cli.output).map_err(|e| e.to_string())
}

/// Replace `@FILE` arguments with the lines of FILE and `@` with stdin.
fn expand_inputs(args: &[String]) -> Result<Vec<String>, String> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg.strip_prefix('@') {
            Some("") => {
                for line in io::stdin().lock().lines() {
                    push_line(&mut out, line.map_err(|e| format!("stdin: {e}"))?);
                }
            }
            Some(file) => {
                let text = std::fs::read_to_string(file).map_err(|e| format!("{file}: {e}"))?;
                for line in text.lines() {
                    push_line(&mut out, line.to_string());
                }
            }
            None => out.push(arg.clone()),
        }
    }
    Ok(out)
}

fn push_line(out: &mut Vec<String>, line: String) {
    if !line.trim().is_empty() {
        out.push(line);
    }
}

/// Split `SOURCE[:LOCAL]` on the last colon.
fn split_input(arg: &str, basedir: Option<&Path>) -> Result<(PathBuf, PathBuf), String> {
    if let Some((source, local)) = arg.rsplit_once(':') {
        return Ok((PathBuf::from(source), PathBuf::from(local)));
    }

    let source = PathBuf::from(arg);
    let local = match basedir {
        Some(base) => source
            .strip_prefix(base)
            .map(Path::to_path_buf)
            .map_err(|_| format!("{arg} is not inside {}", base.display()))?,
        None => source
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| format!("{arg} does not name a file"))?,
    };
    Ok((source, local))
}

fn read_description(arg: &str) -> Result<String, String> {
    match arg.strip_prefix('@') {
        Some(file) => {
            let text = std::fs::read_to_string(file).map_err(|e| format!("{file}: {e}"))?;
            Ok(text.lines().collect::<Vec<_>>().join("\n"))
        }
        None => Ok(arg.to_string()),
    }
}

fn remove_output(path: &Path) -> Result<(), String> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(_) => return Ok(()),
    };
    result.map_err(|e| format!("{}: {e}", path.display()))
}

#[derive(Serialize)]
struct Listing<'a> {
    identifier: &'a str,
    title: &'a str,
    language: &'a str,
    items: Vec<ListedItem<'a>>,
}

#[derive(Serialize)]
struct ListedItem<'a> {
    id: &'a str,
    path: String,
    source: Option<String>,
    media_type: &'a str,
    properties: &'a str,
    in_spine: bool,
    in_toc: bool,
}

fn print_listing(container: &Container) -> Result<(), String> {
    let metadata = container.package().metadata();
    let items = container
        .package()
        .manifest_view()
        .map(|item| ListedItem {
            id: &item.id,
            path: item.path.display().to_string(),
            source: container
                .files()
                .get(&Path::new("Contents").join(&item.path))
                .map(|s| s.display().to_string()),
            media_type: item.media_type(),
            properties: &item.properties,
            in_spine: item.in_spine,
            in_toc: item.in_toc,
        })
        .collect();

    let listing = Listing {
        identifier: metadata.identifier(),
        title: metadata.title(),
        language: metadata.language(),
        items,
    };
    let json = serde_json::to_string_pretty(&listing).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<(Vec<Creator>, Vec<Collection>), clap::Error> {
        let matches = Cli::command().try_get_matches_from(args)?;
        refinements(&matches)
    }

    #[test]
    fn test_refinements_follow_their_creator() {
        let (creators, _) = parse(&[
            "binder", "-C", "Percy Marks", "--role", "aut", "-C", "Anon", "--file-as",
            "Nobody", "ch1.xhtml",
        ])
        .unwrap();
        assert_eq!(creators.len(), 2);
        assert_eq!(creators[0].role.as_deref(), Some("aut"));
        assert_eq!(creators[0].file_as, None);
        assert_eq!(creators[1].file_as.as_deref(), Some("Nobody"));
        assert_eq!(creators[1].role, None);
    }

    #[test]
    fn test_collection_refinements() {
        let (_, collections) = parse(&[
            "binder", "--collection", "A", "--series", "--issue", "2", "--collection", "B",
            "--set", "ch1.xhtml",
        ])
        .unwrap();
        assert_eq!(collections[0].collection_type, CollectionType::Series);
        assert_eq!(collections[0].group_position.as_deref(), Some("2"));
        assert_eq!(collections[1].collection_type, CollectionType::Set);
        assert_eq!(collections[1].group_position, None);
    }

    #[test]
    fn test_same_type_flag_on_each_collection() {
        let (_, collections) = parse(&[
            "binder", "--collection", "A", "--set", "--collection", "B", "--set", "ch1.xhtml",
        ])
        .unwrap();
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].collection_type, CollectionType::Set);
        assert_eq!(collections[1].collection_type, CollectionType::Set);
    }

    #[test]
    fn test_type_flags_across_three_collections() {
        let (_, collections) = parse(&[
            "binder", "--collection", "A", "--series", "--collection", "B", "--set",
            "--collection", "C", "--series", "ch1.xhtml",
        ])
        .unwrap();
        let types: Vec<_> = collections.iter().map(|c| c.collection_type).collect();
        assert_eq!(
            types,
            [CollectionType::Series, CollectionType::Set, CollectionType::Series]
        );
    }

    #[test]
    fn test_untyped_collection_between_typed_ones() {
        let (_, collections) = parse(&[
            "binder", "--collection", "A", "--collection", "B", "--series", "--collection",
            "C", "--series", "ch1.xhtml",
        ])
        .unwrap();
        let types: Vec<_> = collections.iter().map(|c| c.collection_type).collect();
        assert_eq!(
            types,
            [CollectionType::Unspecified, CollectionType::Series, CollectionType::Series]
        );
    }

    #[test]
    fn test_role_and_file_as_on_each_creator() {
        let (creators, _) = parse(&[
            "binder", "-C", "Percy Marks", "--role", "aut", "--file-as", "Marks, Percy", "-C",
            "John Held", "--role", "ill", "--file-as", "Held, John", "ch1.xhtml",
        ])
        .unwrap();
        assert_eq!(creators.len(), 2);
        assert_eq!(creators[0].role.as_deref(), Some("aut"));
        assert_eq!(creators[0].file_as.as_deref(), Some("Marks, Percy"));
        assert_eq!(creators[1].role.as_deref(), Some("ill"));
        assert_eq!(creators[1].file_as.as_deref(), Some("Held, John"));
    }

    #[test]
    fn test_issue_on_each_collection() {
        let (_, collections) = parse(&[
            "binder", "--collection", "A", "--issue", "1", "--collection", "B", "--issue", "7",
            "ch1.xhtml",
        ])
        .unwrap();
        assert_eq!(collections[0].group_position.as_deref(), Some("1"));
        assert_eq!(collections[1].group_position.as_deref(), Some("7"));
    }

    #[test]
    fn test_type_flag_does_not_swallow_input() {
        let matches = Cli::command()
            .try_get_matches_from(["binder", "--collection", "A", "--set", "ch1.xhtml"])
            .unwrap();
        let cli = Cli::from_arg_matches(&matches).unwrap();
        assert_eq!(cli.inputs, ["ch1.xhtml"]);
        assert_eq!(cli.set, [true]);
    }

    #[test]
    fn test_refinement_without_subject() {
        assert!(parse(&["binder", "--role", "aut", "-C", "X", "a.xhtml"]).is_err());
        assert!(parse(&["binder", "--set", "--collection", "X", "a.xhtml"]).is_err());
    }

    #[test]
    fn test_collection_type_given_twice() {
        let err = parse(&["binder", "--collection", "X", "--set", "--series", "a.xhtml"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_role_must_be_marc() {
        assert!(parse(&["binder", "-C", "X", "--role", "author", "a.xhtml"]).is_err());
        assert!(parse(&["binder", "-C", "X", "--role", "AUT", "a.xhtml"]).is_err());
    }

    #[test]
    fn test_split_input() {
        let (s, l) = split_input("art/cover.png:images/cover.png", None).unwrap();
        assert_eq!(s, Path::new("art/cover.png"));
        assert_eq!(l, Path::new("images/cover.png"));

        let (s, l) = split_input("src/text/ch1.xhtml", None).unwrap();
        assert_eq!(s, Path::new("src/text/ch1.xhtml"));
        assert_eq!(l, Path::new("ch1.xhtml"));

        let (_, l) = split_input("src/text/ch1.xhtml", Some(Path::new("src"))).unwrap();
        assert_eq!(l, Path::new("text/ch1.xhtml"));
        assert!(split_input("other/ch1.xhtml", Some(Path::new("src"))).is_err());
    }

    #[test]
    fn test_expand_inputs_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let list = dir.path().join("inputs.txt");
        std::fs::write(&list, "a.xhtml\n\nb.xhtml:text/b.xhtml\n").unwrap();

        let args = vec!["first.xhtml".to_string(), format!("@{}", list.display())];
        let expanded = expand_inputs(&args).unwrap();
        assert_eq!(expanded, ["first.xhtml", "a.xhtml", "b.xhtml:text/b.xhtml"]);
    }

    #[test]
    fn test_description_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("blurb.txt");
        std::fs::write(&path, "Line one\r\nLine two\n").unwrap();
        let text = read_description(&format!("@{}", path.display())).unwrap();
        assert_eq!(text, "Line one\nLine two");
        assert_eq!(read_description("inline").unwrap(), "inline");
    }
}
