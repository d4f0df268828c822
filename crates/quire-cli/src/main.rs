use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use quire_core::actions::ReviewAction;
use quire_core::actions::RuntimeAction;
use quire_core::actions::UserAction;
use quire_core::config::Config;
use quire_core::decisions::merge_decisions;
use quire_core::persistence::load_acting_user;
use quire_core::persistence::load_manuscripts;
use quire_core::persistence::save_acting_user;
use quire_core::persistence::FileCache;
use quire_core::persistence::LocalCache;
use quire_core::persistence::REFEREE_DECISIONS_KEY;
use quire_core::projection::project;
use quire_core::projection::project_one;
use quire_core::reducer::reduce;
use quire_core::roles::Role;
use quire_core::state::ActingUser;
use quire_core::state::ActorDecision;
use quire_core::state::ManuscriptId;
use quire_core::state::MessageLevel;
use quire_core::state::ReviewSession;
use quire_exec::adapters::HttpBackend;
use quire_exec::contracts::ManuscriptApi;
use quire_exec::contracts::NewManuscript;
use quire_exec::contracts::PeopleApi;
use quire_exec::executor::WorkflowExecutor;
use quire_exec::retry::RetryPolicy;
use tracing_subscriber::EnvFilter;

mod render;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "QUIRE_LOG";

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Flags shared by every command, pulled out before dispatch.
struct Globals {
    config_path: Option<PathBuf>,
}

fn split_globals(raw: Vec<String>) -> CliResult<(Globals, Vec<String>)> {
    let mut globals = Globals { config_path: None };
    let mut rest = Vec::with_capacity(raw.len());
    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let Some(value) = iter.next() else {
                return Err("--config requires a path".into());
            };
            globals.config_path = Some(PathBuf::from(value));
        } else {
            rest.push(arg);
        }
    }
    Ok((globals, rest))
}

/// `ID` followed by `--flag value` pairs and bare `--switch`es.
struct CommandArgs {
    positional: Vec<String>,
    options: Vec<(String, Option<String>)>,
}

impl CommandArgs {
    fn parse(args: &[String], switches: &[&str]) -> CliResult<Self> {
        let mut positional = Vec::new();
        let mut options = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            if !arg.starts_with("--") {
                positional.push(arg.clone());
                i += 1;
                continue;
            }
            if switches.contains(&arg.as_str()) {
                options.push((arg.clone(), None));
                i += 1;
                continue;
            }
            let Some(value) = args.get(i + 1) else {
                return Err(format!("{arg} requires a value").into());
            };
            options.push((arg.clone(), Some(value.clone())));
            i += 2;
        }
        Ok(Self {
            positional,
            options,
        })
    }

    fn manuscript_id(&self) -> CliResult<ManuscriptId> {
        match self.positional.as_slice() {
            [id] => Ok(ManuscriptId::new(id.as_str())),
            [] => Err("missing manuscript id".into()),
            _ => Err(format!("unexpected arguments: {}", self.positional[1..].join(" ")).into()),
        }
    }

    fn value(&self, flag: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(name, _)| name == flag)
            .and_then(|(_, value)| value.as_deref())
    }

    fn required(&self, flag: &str) -> CliResult<&str> {
        self.value(flag)
            .ok_or_else(|| format!("{flag} is required").into())
    }

    fn switch(&self, flag: &str) -> bool {
        self.options.iter().any(|(name, _)| name == flag)
    }

    fn reject_unknown(&self, allowed: &[&str]) -> CliResult<()> {
        match self
            .options
            .iter()
            .find(|(name, _)| !allowed.contains(&name.as_str()))
        {
            Some((name, _)) => Err(format!("unsupported argument: {name}").into()),
            None => Ok(()),
        }
    }
}

fn run() -> CliResult<()> {
    let (globals, args) = split_globals(env::args().skip(1).collect())?;
    let Some((command, rest)) = args.split_first() else {
        print_help();
        return Ok(());
    };

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_help();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("quire {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "identity" => set_identity(&globals, rest),
        "list" => list(&globals, rest),
        "show" => show(&globals, rest),
        "decide" => decide(&globals, rest),
        "comment" => comment(&globals, rest),
        "done" => stage(&globals, rest, ActorDecision::Done),
        "withdraw" => stage(&globals, rest, ActorDecision::Withdraw),
        "assign" => assign(&globals, rest),
        "submit" => submit(&globals, rest),
        "people" => people(&globals, rest),
        _ => {
            print_help();
            Err(format!("unknown command: {command}").into())
        }
    }
}

fn load_config(globals: &Globals) -> CliResult<Config> {
    let path = globals.config_path.clone().or_else(|| {
        dirs::config_dir().map(|dir| dir.join("quire").join("config.toml"))
    });
    let mut config = match path {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    config.apply_env_overrides(|key| env::var(key).ok());
    Ok(config)
}

fn open_cache(config: &Config) -> CliResult<FileCache> {
    let path = match &config.cache.path {
        Some(path) => path.clone(),
        None => dirs::data_dir()
            .ok_or("no data directory; set [cache] path in the config")?
            .join("quire")
            .join("cache.json"),
    };
    tracing::debug!(path = %path.display(), "opening local cache");
    Ok(FileCache::open(path)?)
}

fn acting_user(config: &Config, cache: &FileCache) -> CliResult<ActingUser> {
    load_acting_user(cache)
        .or_else(|| config.identity.as_ref().map(|identity| identity.to_acting_user()))
        .ok_or_else(|| "no identity set; run `quire identity --id ID --role ROLE`".into())
}

type Executor = WorkflowExecutor<HttpBackend, FileCache>;

/// Loads config, identity and cache, then fetches the manuscript list.
fn open_session(globals: &Globals) -> CliResult<(Executor, ReviewSession)> {
    let config = load_config(globals)?;
    let cache = open_cache(&config)?;
    let viewer = acting_user(&config, &cache)?;
    let mut executor = WorkflowExecutor::new(
        HttpBackend::new(&config.api),
        cache,
        RetryPolicy::from(&config.retry),
    );
    let mut session = ReviewSession::new(viewer);
    executor.refresh(&mut session)?;
    Ok((executor, session))
}

/// Prints the inline message the last operation left, failing on errors.
fn report(session: &ReviewSession, id: &ManuscriptId) -> CliResult<()> {
    match session.messages.get(id) {
        Some(message) if message.level == MessageLevel::Error => Err(message.text.clone().into()),
        Some(message) => {
            println!("{}", message.text);
            Ok(())
        }
        None => Ok(()),
    }
}

fn user(action: UserAction) -> ReviewAction {
    ReviewAction::User(action)
}

fn set_identity(globals: &Globals, args: &[String]) -> CliResult<()> {
    let args = CommandArgs::parse(args, &[])?;
    args.reject_unknown(&["--id", "--role", "--email"])?;
    let mut identity = ActingUser::new(args.required("--id")?, Role::from_str(args.required("--role")?)?);
    identity.email = args.value("--email").map(str::to_string);

    let config = load_config(globals)?;
    let mut cache = open_cache(&config)?;
    save_acting_user(&mut cache, &identity)?;
    println!("acting as {} ({})", identity.id, identity.role.label());
    Ok(())
}

fn list(globals: &Globals, args: &[String]) -> CliResult<()> {
    let args = CommandArgs::parse(args, &["--offline"])?;
    args.reject_unknown(&["--offline"])?;

    if args.switch("--offline") {
        let config = load_config(globals)?;
        let cache = open_cache(&config)?;
        let mut session = ReviewSession::new(acting_user(&config, &cache)?);
        let manuscripts = load_manuscripts(&cache);
        let decisions =
            merge_decisions(cache.read(REFEREE_DECISIONS_KEY).as_deref(), &manuscripts);
        reduce(
            &mut session,
            ReviewAction::Runtime(RuntimeAction::ManuscriptsLoaded(manuscripts)),
        );
        render::print_table(&project(&session, &decisions));
        return Ok(());
    }

    let (executor, session) = open_session(globals)?;
    render::print_table(&project(&session, executor.decisions()));
    Ok(())
}

fn show(globals: &Globals, args: &[String]) -> CliResult<()> {
    let args = CommandArgs::parse(args, &["--yaml", "--json"])?;
    args.reject_unknown(&["--yaml", "--json"])?;
    let id = args.manuscript_id()?;
    let (mut executor, mut session) = open_session(globals)?;
    executor.dispatch(&mut session, user(UserAction::ToggleExpanded(id.clone())));

    let manuscript = session
        .manuscript(&id)
        .ok_or_else(|| format!("manuscript {id} is not listed for you"))?;
    let view = project_one(&session, manuscript, executor.decisions());
    let report = render::ManuscriptReport::new(manuscript, &view, executor.decisions());

    if args.switch("--yaml") {
        print!("{}", serde_yaml::to_string(&report)?);
    } else if args.switch("--json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report);
    }
    Ok(())
}

fn decide(globals: &Globals, args: &[String]) -> CliResult<()> {
    let args = CommandArgs::parse(args, &[])?;
    args.reject_unknown(&["--decision", "--referee", "--comment"])?;
    let id = args.manuscript_id()?;
    let decision = ActorDecision::from_str(args.required("--decision")?)?;
    let (mut executor, mut session) = open_session(globals)?;

    executor.dispatch(
        &mut session,
        user(UserAction::SelectDecision {
            manuscript_id: id.clone(),
            decision,
        }),
    );
    if let Some(text) = args.value("--comment") {
        executor.dispatch(
            &mut session,
            user(UserAction::SetCommentDraft {
                manuscript_id: id.clone(),
                text: text.to_string(),
            }),
        );
    }
    if let Some(referee) = args.value("--referee") {
        executor.dispatch(
            &mut session,
            user(UserAction::SetDraftReferee {
                manuscript_id: id.clone(),
                referee_id: referee.to_string(),
            }),
        );
    }
    executor.dispatch(
        &mut session,
        user(UserAction::SubmitDecision {
            manuscript_id: id.clone(),
        }),
    );
    report(&session, &id)
}

fn comment(globals: &Globals, args: &[String]) -> CliResult<()> {
    let args = CommandArgs::parse(args, &[])?;
    args.reject_unknown(&["--text"])?;
    let id = args.manuscript_id()?;
    let text = args.required("--text")?.to_string();
    let (mut executor, mut session) = open_session(globals)?;

    executor.dispatch(
        &mut session,
        user(UserAction::SetCommentDraft {
            manuscript_id: id.clone(),
            text,
        }),
    );
    executor.dispatch(
        &mut session,
        user(UserAction::PostComment {
            manuscript_id: id.clone(),
        }),
    );
    report(&session, &id)
}

fn stage(globals: &Globals, args: &[String], decision: ActorDecision) -> CliResult<()> {
    let args = CommandArgs::parse(args, &[])?;
    args.reject_unknown(&[])?;
    let id = args.manuscript_id()?;
    let (mut executor, mut session) = open_session(globals)?;

    let action = match decision {
        ActorDecision::Withdraw => UserAction::Withdraw(id.clone()),
        _ => UserAction::MarkDone(id.clone()),
    };
    executor.dispatch(&mut session, user(action));
    report(&session, &id)
}

fn assign(globals: &Globals, args: &[String]) -> CliResult<()> {
    let args = CommandArgs::parse(args, &[])?;
    args.reject_unknown(&["--referee"])?;
    let id = args.manuscript_id()?;
    let referee = args.required("--referee")?.to_string();
    let (mut executor, mut session) = open_session(globals)?;

    executor.dispatch(
        &mut session,
        user(UserAction::AssignReferee {
            manuscript_id: id.clone(),
            referee_id: referee,
        }),
    );
    report(&session, &id)
}

fn submit(globals: &Globals, args: &[String]) -> CliResult<()> {
    let args = CommandArgs::parse(args, &[])?;
    args.reject_unknown(&["--title"])?;
    let title = args.required("--title")?.trim().to_string();
    if title.is_empty() {
        return Err("--title must not be empty".into());
    }
    let (executor, session) = open_session(globals)?;
    if session.viewer.role != Role::Author {
        return Err("only authors submit manuscripts".into());
    }

    let created = executor.backend().create_manuscript(&NewManuscript {
        title,
        author_id: session.viewer.id.clone(),
        author_email: session.viewer.email.clone(),
    })?;
    tracing::info!(manuscript = %created.id, "manuscript submitted");
    println!("submitted {} ({})", created.id, created.state.label());
    Ok(())
}

fn people(globals: &Globals, args: &[String]) -> CliResult<()> {
    let args = CommandArgs::parse(args, &[])?;
    args.reject_unknown(&[])?;
    let config = load_config(globals)?;
    let backend = HttpBackend::new(&config.api);
    render::print_people(&backend.list_people()?);
    Ok(())
}

fn print_help() {
    println!("quire {}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  quire [--config PATH] COMMAND");
    println!();
    println!("Commands:");
    println!("  identity --id ID --role ROLE [--email EMAIL]");
    println!("  list [--offline]");
    println!("  show ID [--yaml | --json]");
    println!("  decide ID --decision DECISION [--referee ID] [--comment TEXT]");
    println!("  comment ID --text TEXT");
    println!("  done ID");
    println!("  withdraw ID");
    println!("  assign ID --referee EMAIL_OR_ID");
    println!("  submit --title TITLE");
    println!("  people");
    println!();
    println!("Set {LOG_ENV}=debug for request logging.");
}
