mod compose;
mod wizard;

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use mupp_api::{ApiClient, DEFAULT_BASE_URL, SessionKey, SignUpError, SignupForm, session_from_cookies};
use mupp_schema::{
    AnswersValidation, AttributeKind, BuilderStore, EntityKind, InterpreterStore, Registry, Schema,
    build_render_payload, render_json, render_text,
};

use compose::{ComposeError, FieldInput, apply_field, ensure_publishable, revalidate_entity};
use wizard::{FillPresenter, PromptContext, Verbosity, parse_answer};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "MUPP terminal client",
    long_about = "Compose project-planner forms, fill them out, and talk to the MUPP backend"
)]
struct Cli {
    /// Backend base URL (defaults to MUPP_SERVER_URL or http://localhost:5001).
    #[arg(long, value_name = "URL", global = true)]
    server: Option<String>,
    /// Session key (defaults to MUPP_SESSION, or the `session` cookie in MUPP_COOKIE).
    #[arg(long, value_name = "KEY", global = true)]
    session: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Compose a new form schema interactively.
    Compose {
        /// Write the validated schema to this file instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Save the validated schema to the backend (requires a session).
        #[arg(long)]
        save: bool,
        /// Show progress details while composing.
        #[arg(long)]
        verbose: bool,
    },
    /// Fill a form from a schema file or a hosted form id.
    Fill {
        /// Path to a schema JSON file.
        #[arg(long, value_name = "FILE")]
        schema: Option<PathBuf>,
        /// Hosted form id to fetch from the backend.
        #[arg(long, value_name = "ID")]
        form: Option<String>,
        /// Write the validated answers to this file.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Submit the validated answers to the backend (requires --form).
        #[arg(long)]
        submit: bool,
        /// Show statuses, field lists, and parse expectations.
        #[arg(long, alias = "debug")]
        verbose: bool,
    },
    /// Validate an answers file against a schema file.
    Validate {
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,
        #[arg(long, value_name = "FILE")]
        answers: PathBuf,
    },
    /// Render a schema's fill view.
    Preview {
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Create an account and log in.
    Register,
    /// Log in and print the session key.
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Invalidate the current session.
    Logout,
    /// Probe the backend (Ctrl-C aborts the probe).
    Ping,
    /// Hosted forms.
    Forms {
        #[command(subcommand)]
        command: FormsCommand,
    },
    /// Show the responses collected for a form.
    Responses { form_id: String },
    /// Show the participant groupings computed for a form.
    Groupings { form_id: String },
}

#[derive(Subcommand)]
enum FormsCommand {
    /// List the account's forms.
    List,
    /// Delete a form by id.
    Delete { form_id: String },
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    let server = resolve_server(cli.server);
    let session = cli.session;

    match cli.command {
        Command::Compose { out, save, verbose } => {
            run_compose(&server, session, out, save, verbose)
        }
        Command::Fill {
            schema,
            form,
            out,
            submit,
            verbose,
        } => run_fill(&server, schema, form, out, submit, verbose),
        Command::Validate { schema, answers } => run_validate(&schema, &answers),
        Command::Preview { schema, format } => run_preview(&schema, format),
        Command::Register => run_register(&server),
        Command::Login { email } => run_login(&server, email),
        Command::Logout => run_logout(&server, session),
        Command::Ping => run_ping(&server),
        Command::Forms { command } => match command {
            FormsCommand::List => run_forms_list(&server, session),
            FormsCommand::Delete { form_id } => run_forms_delete(&server, session, &form_id),
        },
        Command::Responses { form_id } => run_responses(&server, session, &form_id),
        Command::Groupings { form_id } => run_groupings(&server, session, &form_id),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}

fn resolve_server(arg: Option<String>) -> String {
    arg.filter(|url| !url.trim().is_empty())
        .or_else(|| env::var("MUPP_SERVER_URL").ok().filter(|url| !url.is_empty()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

fn resolve_session(arg: Option<String>) -> CliResult<SessionKey> {
    if let Some(key) = arg.filter(|key| !key.trim().is_empty()) {
        return Ok(SessionKey::new(key));
    }
    if let Ok(key) = env::var("MUPP_SESSION")
        && !key.trim().is_empty()
    {
        return Ok(SessionKey::new(key));
    }
    if let Ok(cookie) = env::var("MUPP_COOKIE") {
        return Ok(session_from_cookies(&cookie)?);
    }
    Err("no session key available; log in first and set MUPP_SESSION or pass --session".into())
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    // The client is single-threaded and cooperative; network calls are the
    // only suspension points.
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn run_compose(
    server: &str,
    session: Option<String>,
    out: Option<PathBuf>,
    save: bool,
    verbose: bool,
) -> CliResult<()> {
    println!("Interactive form composer");
    println!("Every form starts with the seeded leader question.");

    let mut store = BuilderStore::seeded(Registry::standard());

    loop {
        let choice = prompt_line("Add field (text/scale/checkbox, blank to finish)", None)?;
        let kind = match choice.trim().to_lowercase().as_str() {
            "" => break,
            "text" | "textfield" => EntityKind::TextField,
            "scale" | "numberscale" | "number" => EntityKind::NumberScale,
            "checkbox" | "boolean" | "bool" => EntityKind::Boolean,
            other => {
                println!("Unknown field type '{other}'. Choose text, scale, or checkbox.");
                continue;
            }
        };

        let mut input = FieldInput::new(kind, prompt_non_empty("Field label", None)?);
        match kind {
            EntityKind::TextField | EntityKind::Boolean => {
                input.required = Some(prompt_bool("Required?", false)?);
                if kind == EntityKind::Boolean {
                    input.default_value = Some(Value::Bool(prompt_bool("Checked by default?", false)?));
                }
            }
            EntityKind::NumberScale => {
                input.weight = Some(prompt_i64("Weight (1-5)", 1)?);
                input.min = Some(prompt_i64("Minimum", 1)?);
                input.max = Some(prompt_i64("Maximum", 10)?);
                if let Some(default) = prompt_optional_i64("Default value (blank for midpoint)")? {
                    input.default_value = Some(Value::from(default));
                }
            }
            EntityKind::IsLeader => unreachable!("not offered by the composer menu"),
        }

        let (id, mut failures) = apply_field(&mut store, input)?;
        while !failures.is_empty() {
            for check in &failures {
                if let Some(error) = &check.error {
                    println!("{}: {}", check.attribute.name(), error.message);
                }
            }
            for check in std::mem::take(&mut failures) {
                let value = loop {
                    let raw = prompt_line(
                        &format!("New value for {}", check.attribute.name()),
                        None,
                    )?;
                    match parse_attribute_value(kind, check.attribute, &raw) {
                        Ok(value) => break value,
                        Err(err) => println!("{err}"),
                    }
                };
                store.set_attribute_value(&id, check.attribute.name(), value)?;
            }
            // An updated bound must re-check min against max, so the whole
            // entity is re-validated rather than single attributes.
            failures = revalidate_entity(&mut store, &id)?;
        }

        if verbose {
            println!(
                "Schema now holds {} field(s).",
                store.schema().len()
            );
        }
    }

    let schema = match ensure_publishable(&mut store) {
        Ok(schema) => schema,
        Err(ComposeError::OnlySeeded) => {
            return Err(compose::ONLY_SEEDED_MESSAGE.into());
        }
        Err(ComposeError::Invalid(errors)) => {
            eprintln!("Please fix errors in the form before saving:");
            for (entity_id, attributes) in &errors {
                for (attribute, error) in attributes {
                    eprintln!("  {entity_id}/{attribute}: {}", error.message);
                }
            }
            return Err("schema validation failed".into());
        }
    };

    if save {
        let session = resolve_session(session)?;
        let client = ApiClient::new(server)?;
        let endpoint = runtime()?.block_on(client.save_form(&session, &schema))?;
        println!("Form saved! ID: {endpoint}");
    }
    if let Some(path) = out {
        write_json_file(&path, &schema)?;
        println!("Schema written to {}", path.display());
    } else if !save {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    }
    Ok(())
}

fn parse_attribute_value(
    kind: EntityKind,
    attribute: AttributeKind,
    raw: &str,
) -> CliResult<Value> {
    let value = match attribute {
        AttributeKind::Label => Some(Value::String(raw.trim().to_string())),
        AttributeKind::Required => parse_answer(EntityKind::Boolean, raw)
            .map_err(|error| error.user_message)?,
        AttributeKind::Min | AttributeKind::Max | AttributeKind::Weight => {
            parse_answer(EntityKind::NumberScale, raw).map_err(|error| error.user_message)?
        }
        // A default value is typed like an answer to the field itself.
        AttributeKind::DefaultValue => {
            parse_answer(kind, raw).map_err(|error| error.user_message)?
        }
    };
    // A blank line unsets the attribute; stores treat null as removal.
    Ok(value.unwrap_or(Value::Null))
}

fn load_schema_file(path: &Path) -> CliResult<Schema> {
    let contents = fs::read_to_string(path)?;
    let schema: Schema = serde_json::from_str(&contents)?;
    Ok(schema)
}

fn run_fill(
    server: &str,
    schema_path: Option<PathBuf>,
    form_id: Option<String>,
    out: Option<PathBuf>,
    submit: bool,
    verbose: bool,
) -> CliResult<()> {
    let schema = match (&schema_path, &form_id) {
        (Some(path), _) => load_schema_file(path)?,
        (None, Some(id)) => {
            let client = ApiClient::new(server)?;
            runtime()?.block_on(client.fetch_form(id))?
        }
        (None, None) => return Err("provide --schema or --form".into()),
    };
    if submit && form_id.is_none() {
        return Err("--submit requires --form".into());
    }

    let registry = Registry::standard();
    let mut store = InterpreterStore::new(&registry, schema)?;
    let mut presenter = FillPresenter::new(Verbosity::from_verbose(verbose));

    let payload = build_render_payload(&store);
    presenter.show_header(&payload);
    presenter.show_progress(&payload);

    let order = store.schema().display_order();
    let total = order.len();
    for (index, entity_id) in order.iter().enumerate() {
        let Some(instance) = store.schema().get(entity_id) else {
            continue;
        };
        let kind = instance.kind;
        let label = instance
            .label()
            .unwrap_or(kind.display_name())
            .to_string();
        let required = instance.context().required();

        loop {
            let prompt = PromptContext::new(
                index + 1,
                total,
                &label,
                kind,
                required,
                store.effective_value(entity_id),
            );
            presenter.show_prompt(&prompt);
            let line = read_answer_line()?;
            if line.trim().eq_ignore_ascii_case("exit") {
                return Err("fill aborted by user".into());
            }

            match parse_answer(kind, &line) {
                Err(error) => {
                    presenter.show_parse_error(&error);
                    continue;
                }
                Ok(Some(value)) => {
                    store.set_entity_value(entity_id, value)?;
                }
                // Blank input keeps the current (possibly default) value.
                Ok(None) => {}
            }

            let check = store.validate_entity_value(entity_id)?;
            match check.error {
                None => break,
                Some(error) => presenter.show_validation_error(&error.message),
            }
        }
    }

    match store.validate_entities_values() {
        AnswersValidation::Valid(answers) => {
            let map: serde_json::Map<String, Value> = answers.clone().into_iter().collect();
            presenter.show_completion(&map);
            if let Some(path) = &out {
                write_json_file(path, &map)?;
                println!("Answers written to {}", path.display());
            }
            if submit && let Some(id) = &form_id {
                let client = ApiClient::new(server)?;
                runtime()?.block_on(client.submit_response(id, &answers))?;
                println!("Response submitted ✅");
            }
            if out.is_none() && !submit {
                println!("{}", serde_json::to_string_pretty(&map)?);
            }
            Ok(())
        }
        AnswersValidation::Invalid(errors) => {
            eprintln!("Please correct the errors in the form before saving it:");
            for (entity_id, error) in &errors {
                eprintln!("  {entity_id}: {}", error.message);
            }
            Err("validation failed".into())
        }
    }
}

fn run_validate(schema_path: &Path, answers_path: &Path) -> CliResult<()> {
    let schema = load_schema_file(schema_path)?;
    let answers_json = fs::read_to_string(answers_path)?;
    let answers: Value = serde_json::from_str(&answers_json)?;
    let answers = answers
        .as_object()
        .ok_or("answers file must contain a JSON object")?
        .clone();

    let registry = Registry::standard();
    let mut store = InterpreterStore::new(&registry, schema)?;

    let mut unknown_fields = Vec::new();
    for (entity_id, value) in answers {
        if store.schema().contains(&entity_id) {
            store.set_entity_value(&entity_id, value)?;
        } else {
            unknown_fields.push(entity_id);
        }
    }

    let result = store.validate_entities_values();
    let valid = result.is_valid() && unknown_fields.is_empty();
    println!(
        "Validation result: {}",
        if valid { "valid" } else { "invalid" }
    );
    if let Some(errors) = result.errors() {
        println!("Errors:");
        for (entity_id, error) in errors {
            println!("  {entity_id} - {}", error.message);
        }
    }
    if !unknown_fields.is_empty() {
        println!("Unknown answer fields: {}", unknown_fields.join(", "));
    }

    if valid { Ok(()) } else { Err("validation failed".into()) }
}

fn run_preview(schema_path: &Path, format: RenderMode) -> CliResult<()> {
    let schema = load_schema_file(schema_path)?;
    let store = InterpreterStore::new(&Registry::standard(), schema)?;
    let payload = build_render_payload(&store);
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => println!("{}", serde_json::to_string_pretty(&render_json(&payload))?),
    }
    Ok(())
}

fn run_register(server: &str) -> CliResult<()> {
    let username = prompt_non_empty("Username", None)?;
    let email = prompt_non_empty("Email", None)?;
    let password = prompt_non_empty("Password", None)?;
    let confirm_password = prompt_non_empty("Confirm password", None)?;

    let form = SignupForm {
        username,
        email,
        password,
        confirm_password,
    };
    let client = ApiClient::new(server)?;
    match runtime()?.block_on(client.sign_up(&form)) {
        Ok(session) => {
            println!("Account created and logged in.");
            print_session_hint(&session);
            Ok(())
        }
        Err(SignUpError::Invalid(errors)) => {
            for (field, message) in &errors {
                eprintln!("  {field}: {message}");
            }
            Err("sign-up form is invalid".into())
        }
        Err(SignUpError::Api(error)) => Err(error.into()),
    }
}

fn run_login(server: &str, email: Option<String>) -> CliResult<()> {
    let email = match email {
        Some(email) => email,
        None => prompt_non_empty("Email", None)?,
    };
    let password = prompt_non_empty("Password", None)?;
    let client = ApiClient::new(server)?;
    let session = runtime()?.block_on(client.login(&email, &password))?;
    print_session_hint(&session);
    Ok(())
}

fn print_session_hint(session: &SessionKey) {
    println!("Session key: {session}");
    println!("  export MUPP_SESSION={session}");
}

fn run_logout(server: &str, session: Option<String>) -> CliResult<()> {
    let session = resolve_session(session)?;
    let client = ApiClient::new(server)?;
    runtime()?.block_on(client.logout(&session))?;
    println!("User has been logged out.");
    Ok(())
}

fn run_ping(server: &str) -> CliResult<()> {
    let client = ApiClient::new(server)?;
    let body = runtime()?.block_on(async {
        let cancel = CancellationToken::new();
        let guard = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                guard.cancel();
            }
        });
        let outcome = client.ping(&cancel).await;
        watcher.abort();
        outcome
    })?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn run_forms_list(server: &str, session: Option<String>) -> CliResult<()> {
    let session = resolve_session(session)?;
    let client = ApiClient::new(server)?;
    let forms = runtime()?.block_on(client.list_forms(&session))?;
    println!("{}", serde_json::to_string_pretty(&forms)?);
    Ok(())
}

fn run_forms_delete(server: &str, session: Option<String>, form_id: &str) -> CliResult<()> {
    let session = resolve_session(session)?;
    let client = ApiClient::new(server)?;
    runtime()?.block_on(client.delete_form(&session, form_id))?;
    println!("Form {form_id} deleted.");
    Ok(())
}

fn run_responses(server: &str, session: Option<String>, form_id: &str) -> CliResult<()> {
    let session = resolve_session(session)?;
    let client = ApiClient::new(server)?;
    let responses = runtime()?.block_on(client.fetch_responses(&session, form_id))?;
    println!("{}", serde_json::to_string_pretty(&responses)?);
    Ok(())
}

fn run_groupings(server: &str, session: Option<String>, form_id: &str) -> CliResult<()> {
    let session = resolve_session(session)?;
    let client = ApiClient::new(server)?;
    let groupings = runtime()?.block_on(client.fetch_groupings(&session, form_id))?;
    println!("{}", serde_json::to_string_pretty(&groupings)?);
    Ok(())
}

fn read_answer_line() -> CliResult<String> {
    print!("> ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}

fn prompt_line(prompt: &str, default: Option<&str>) -> CliResult<String> {
    if let Some(default_value) = default {
        print!("{prompt} [{default_value}]: ");
    } else {
        print!("{prompt}: ");
    }
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        if let Some(default_value) = default {
            Ok(default_value.to_string())
        } else {
            Ok(String::new())
        }
    } else {
        Ok(trimmed.to_string())
    }
}

fn prompt_non_empty(prompt: &str, default: Option<&str>) -> CliResult<String> {
    loop {
        let value = prompt_line(prompt, default)?;
        if !value.trim().is_empty() {
            return Ok(value);
        }
        println!("Value cannot be empty.");
    }
}

fn prompt_bool(prompt: &str, default: bool) -> CliResult<bool> {
    let prompt_text = format!("{} (y/n)", prompt.trim());
    let default_hint = if default { "Y" } else { "N" };
    loop {
        let line = prompt_line(&prompt_text, Some(default_hint))?;
        match line.trim().to_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            other => {
                println!("Invalid answer '{other}'. Expected yes or no.");
            }
        }
    }
}

fn prompt_i64(prompt: &str, default: i64) -> CliResult<i64> {
    let default_text = default.to_string();
    loop {
        let raw = prompt_line(prompt, Some(&default_text))?;
        match raw.trim().parse::<i64>() {
            Ok(value) => return Ok(value),
            Err(_) => println!("Please enter a whole number."),
        }
    }
}

fn prompt_optional_i64(prompt: &str) -> CliResult<Option<i64>> {
    loop {
        let raw = prompt_line(prompt, None)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match trimmed.parse::<i64>() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => println!("Please enter a whole number or leave blank."),
        }
    }
}

fn write_json_file(path: &Path, value: &impl serde::Serialize) -> CliResult<()> {
    let contents = serde_json::to_string_pretty(value)?;
    fs::write(path, contents)?;
    Ok(())
}
