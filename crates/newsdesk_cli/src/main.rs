//! `newsdesk` command-line client.
//!
//! Each invocation loads the collection once, performs one command and exits.

mod view;

use anyhow::{anyhow, bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use newsdesk_core::db::open_db;
use newsdesk_core::{
    core_version, init_logging_from_config, load_config, FsObjectStore, ImageUpload,
    LocalAuthProvider, RecordStoreClient, RecordStoreOptions, SqliteDocumentCollection,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use view::{render_json, render_text, ListFilter};

fn cli() -> Command {
    Command::new("newsdesk")
        .version(core_version())
        .about("Manage news and event records and their images")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON config file"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .help("Editor account to sign in as before mutating"),
        )
        .subcommand(
            Command::new("list")
                .about("List news and events")
                .arg(
                    Arg::new("news")
                        .long("news")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("events")
                        .help("Only list news"),
                )
                .arg(
                    Arg::new("events")
                        .long("events")
                        .action(ArgAction::SetTrue)
                        .help("Only list events"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("add")
                .about("Upload an image and create a record")
                .arg(Arg::new("headline").long("headline").required(true))
                .arg(Arg::new("content").long("content").required(true))
                .arg(
                    Arg::new("image")
                        .long("image")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("event")
                        .long("event")
                        .action(ArgAction::SetTrue)
                        .help("Create an event instead of news"),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Edit headline, content or image of a record")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("headline").long("headline"))
                .arg(Arg::new("content").long("content"))
                .arg(
                    Arg::new("image")
                        .long("image")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a record and its image")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(Command::new("version").about("Print the core version"))
}

fn main() {
    if let Err(err) = run(cli().get_matches()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(matches: ArgMatches) -> Result<()> {
    if let Some(("version", _)) = matches.subcommand() {
        println!("newsdesk_core version={}", core_version());
        return Ok(());
    }

    let config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("failed to load config")?;
    init_logging_from_config(&config).map_err(|err| anyhow!(err))?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let collection = SqliteDocumentCollection::try_new(&conn, config.collection.as_str())?;
    let objects = FsObjectStore::try_new(&config.object_root, config.resolved_public_base_url())
        .with_context(|| {
            format!(
                "failed to open object root `{}`",
                config.object_root.display()
            )
        })?;
    let auth = Arc::new(LocalAuthProvider::new(&config.editors));
    let mut client =
        RecordStoreClient::new(collection, objects, auth, RecordStoreOptions::from(&config));

    if let Some(account) = matches.get_one::<String>("user") {
        client
            .sign_in(account)
            .map_err(|err| anyhow!("sign-in failed: {err}"))?;
    }
    // Load failures are logged by the client; listing then shows an empty feed.
    let _ = client.load();

    match matches.subcommand() {
        Some(("list", args)) => list(&client, args),
        Some(("add", args)) => add(&mut client, args),
        Some(("edit", args)) => edit(&mut client, args),
        Some(("delete", args)) => delete(&mut client, args),
        Some((other, _)) => bail!("unknown command `{other}`"),
        None => bail!("missing command"),
    }
}

type CliClient<'conn> = RecordStoreClient<SqliteDocumentCollection<'conn>, FsObjectStore>;

fn list(client: &CliClient<'_>, args: &ArgMatches) -> Result<()> {
    let filter = if args.get_flag("news") {
        ListFilter::News
    } else if args.get_flag("events") {
        ListFilter::Events
    } else {
        ListFilter::All
    };
    let feed = client.feed();
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&render_json(&feed, filter))?);
    } else {
        print!("{}", render_text(&feed, filter));
    }
    Ok(())
}

fn add(client: &mut CliClient<'_>, args: &ArgMatches) -> Result<()> {
    let headline = required(args, "headline")?;
    let content = required(args, "content")?;
    let image = match args.get_one::<PathBuf>("image") {
        Some(path) => Some(read_image(path)?),
        None => None,
    };
    let record = client.create_record(headline, content, image, !args.get_flag("event"))?;
    println!("created {} {}", record.kind().as_str(), record.id);
    Ok(())
}

fn edit(client: &mut CliClient<'_>, args: &ArgMatches) -> Result<()> {
    let id = required(args, "id")?;
    let image = match args.get_one::<PathBuf>("image") {
        Some(path) => Some(read_image(path)?),
        None => None,
    };

    let draft = client.begin_edit(&id)?;
    if let Some(headline) = args.get_one::<String>("headline") {
        draft.headline = headline.clone();
    }
    if let Some(content) = args.get_one::<String>("content") {
        draft.content = content.clone();
    }
    draft.image_file = image;

    let record = client.save_edit(&id)?;
    println!("updated {}", record.id);
    Ok(())
}

fn delete(client: &mut CliClient<'_>, args: &ArgMatches) -> Result<()> {
    let id = required(args, "id")?;
    let outcome = client.delete_cached(&id)?;
    if outcome.image_removed {
        println!("deleted {}", outcome.id);
    } else {
        println!("deleted {} (image left in place)", outcome.id);
    }
    Ok(())
}

fn required(args: &ArgMatches, name: &str) -> Result<String> {
    args.get_one::<String>(name)
        .cloned()
        .ok_or_else(|| anyhow!("missing --{name}"))
}

fn read_image(path: &Path) -> Result<ImageUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("image path has no file name: `{}`", path.display()))?;
    Ok(ImageUpload::new(file_name, bytes))
}

#[cfg(test)]
mod tests {
    use super::cli;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn list_flags_conflict() {
        let result = cli().try_get_matches_from(["newsdesk", "list", "--news", "--events"]);
        assert!(result.is_err());
    }

    #[test]
    fn global_user_flag_is_accepted_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["newsdesk", "delete", "abc", "--user", "editor@example.com"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "delete");
        assert_eq!(args.get_one::<String>("id").unwrap(), "abc");
        assert_eq!(
            args.get_one::<String>("user").map(String::as_str),
            Some("editor@example.com")
        );
    }
}
