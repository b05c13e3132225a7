// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    clap::{Arg, ArgMatches, Command},
    debian_release_resolver::{
        cache::cache_key,
        config::ResolverConfig,
        error::ResolverError,
        repository::location::resolve_component_urls,
        resolver::ReleaseResolver,
    },
    log::LevelFilter,
    std::path::PathBuf,
    thiserror::Error,
};

const LOCATIONS_ABOUT: &str = "\
Repository Locations

Various commands accept a repository location. A repository location is the
URL of the root of a Debian repository (typically a directory containing
`dists` and `pool` sub-directories) with query string parameters selecting
which binary package indices to read.

e.g. https://deb.debian.org/debian?suite=stable&components=main,contrib&binaryArch=amd64

The following parameters are recognized:

components (required)
   Comma delimited names of components to read. e.g. `main,contrib`.

binaryArch (required)
   Architecture of binary packages to read. e.g. `amd64`.

release
   Codename of the release (distribution) to read. e.g. `bookworm`.

suite
   Alias of the release to read. e.g. `stable`. Only used if `release` is
   not present. One of `release` or `suite` is required.

Other parameters are preserved on the URLs requested from the repository.

Each component is read from
`<root>/dists/<release>/<component>/binary-<binaryArch>/Packages.<ext>`.

The following URL schemes are recognized:

http:// and https://
   A HTTP-based repository.

file://
   A local filesystem path.
";

const RESOLVE_ABOUT: &str = "\
Resolve releases of a package.

Every component of the repository location is searched for the package. The
versions found, in component order, and the homepage of the package are
printed as JSON.

Indices are cached locally. Subsequent invocations only download indices
that changed in the repository.

If no component has the package, `package not found` is printed and the
process exits with code 1.
";

const CONFIG_ABOUT: &str = "\
Path to a YAML file configuring the resolver.

The following keys are recognized:

cache_dir (string)
   Directory holding cached state.

compressions (list[string])
   Compression formats of indices to try, in order. e.g. `[xz, gz]`.

parse_cache_ttl_secs (int)
   How long to remember parsed indices, in seconds.

concurrency (int)
   Maximum number of components processed at once.

user_agent (string)
   User-Agent sent with HTTP requests.
";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("argument parsing error: {0:?}")]
    Clap(#[from] clap::Error),

    #[error("{0:?}")]
    Resolver(#[from] ResolverError),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0:?}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("invalid sub-command: {0}")]
    InvalidSubCommand(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;

fn app() -> Command<'static> {
    let app = Command::new("Debian Release Resolver")
        .version("0.1")
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Resolve package releases from Debian repositories")
        .arg_required_else_help(true);

    let app = app
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .takes_value(true)
                .global(true)
                .allow_invalid_utf8(true)
                .help("Path to a YAML file configuring the resolver")
                .long_help(CONFIG_ABOUT),
        )
        .arg(
            Arg::new("cache-dir")
                .long("cache-dir")
                .takes_value(true)
                .global(true)
                .allow_invalid_utf8(true)
                .help("Directory holding cached indices"),
        )
        .arg(
            Arg::new("max-parallel-io")
                .long("max-parallel-io")
                .takes_value(true)
                .global(true)
                .help("Maximum number of components to process at once"),
        );

    let app = app.subcommand(
        Command::new("resolve")
            .about("Resolve releases of a package")
            .long_about(RESOLVE_ABOUT)
            .arg(
                Arg::new("location")
                    .required(true)
                    .help("Repository location to search"),
            )
            .arg(
                Arg::new("package")
                    .required(true)
                    .help("Name of the binary package"),
            ),
    );

    let app = app.subcommand(
        Command::new("components")
            .about("Print the index URLs of components of a repository location")
            .arg(
                Arg::new("location")
                    .required(true)
                    .help("Repository location to resolve"),
            ),
    );

    let app = app.subcommand(
        Command::new("cache-key")
            .about("Print the cache key of a component URL")
            .arg(Arg::new("url").required(true).help("Component URL")),
    );

    app.subcommand(
        Command::new("locations").about("Print documentation about repository locations"),
    )
}

fn init_logging(matches: &ArgMatches) {
    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    if log_level == LevelFilter::Info {
        builder.filter_module("rustls", LevelFilter::Error);
    }

    builder.init();
}

/// Resolve the resolver configuration from arguments.
fn resolver_config(args: &ArgMatches) -> Result<ResolverConfig> {
    let mut config = match args.value_of_os("config") {
        Some(path) => ResolverConfig::from_yaml_path(path)?,
        None => ResolverConfig::default(),
    };

    if let Some(path) = args.value_of_os("cache-dir") {
        config.cache_dir = PathBuf::from(path);
    }

    if args.is_present("max-parallel-io") {
        config.concurrency = args.value_of_t::<usize>("max-parallel-io")?;
    }

    Ok(config)
}

pub async fn run_cli() -> Result<i32> {
    let mut app = app();

    let matches = app.clone().get_matches();

    init_logging(&matches);

    match matches.subcommand() {
        Some(("resolve", args)) => command_resolve(args).await,
        Some(("components", args)) => command_components(args),
        Some(("cache-key", args)) => command_cache_key(args),
        Some(("locations", _)) => {
            println!("{}", LOCATIONS_ABOUT);
            Ok(0)
        }
        Some((command, _)) => Err(ToolError::InvalidSubCommand(command.to_string())),
        None => {
            app.print_help()?;
            Ok(0)
        }
    }
}

async fn command_resolve(args: &ArgMatches) -> Result<i32> {
    let location = args
        .value_of("location")
        .expect("location argument is required");
    let package = args
        .value_of("package")
        .expect("package argument is required");

    let config = resolver_config(args)?;
    let resolver = ReleaseResolver::from_config(&config).await?;

    match resolver.resolve(location, package).await? {
        Some(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(0)
        }
        None => {
            eprintln!("package not found");
            Ok(1)
        }
    }
}

fn command_components(args: &ArgMatches) -> Result<i32> {
    let location = args
        .value_of("location")
        .expect("location argument is required");

    for url in resolve_component_urls(location)? {
        println!("{}", url);
    }

    Ok(0)
}

fn command_cache_key(args: &ArgMatches) -> Result<i32> {
    let url = args.value_of("url").expect("url argument is required");

    println!("{}", cache_key(url));

    Ok(0)
}
