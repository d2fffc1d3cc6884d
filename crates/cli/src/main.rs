use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use patients_client::HttpPatientApi;
use patients_core::{
    config::{
        base_url_from_env_value, detail_lifecycle_from_env_value, stale_responses_from_env_value,
    },
    constants::{DELETE_FAILED, UPDATE_FAILED},
    filter_patients, validate_create_patient, validate_update_patient, CoreConfig, Family,
    PatientStore, StatusFilter, StoreConfig,
};
use serde_json::{Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod view;

#[derive(Parser)]
#[command(name = "patients")]
#[command(about = "Patient dashboard CLI")]
struct Cli {
    /// Base URL of the patients backend
    #[arg(long, env = "PATIENTS_API_BASE_URL")]
    base_url: Option<String>,
    /// Loading/error pair used by `show`: shared (with list) or separate
    #[arg(long, env = "PATIENTS_DETAIL_LIFECYCLE")]
    detail_lifecycle: Option<String>,
    /// Out-of-order responses: last-wins or ignore
    #[arg(long, env = "PATIENTS_STALE_RESPONSES")]
    stale_responses: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List patients with status counts
    List {
        /// Case-insensitive search on first, middle and last names
        #[arg(long, default_value = "")]
        search: String,
        /// All, Inquiry, Onboarding, Active or Churned
        #[arg(long, default_value = "All")]
        status: StatusFilter,
    },
    /// Show one patient
    Show {
        /// Patient ID
        id: String,
    },
    /// Create a patient (validated before anything is sent)
    Create(FormArgs),
    /// Update some fields of a patient
    Update {
        /// Patient ID
        id: String,
        #[command(flatten)]
        fields: FormArgs,
    },
    /// Delete a patient
    Delete {
        /// Patient ID
        id: String,
    },
}

/// Patient form fields. Missing values are reported by validation, not by argument parsing.
#[derive(Args)]
struct FormArgs {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    middle_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    date_of_birth: Option<String>,
    /// Inquiry, Onboarding, Active or Churned
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    street: Option<String>,
    #[arg(long)]
    city: Option<String>,
    /// Two-letter state code
    #[arg(long)]
    state: Option<String>,
    /// 12345 or 12345-6789
    #[arg(long)]
    zip_code: Option<String>,
}

impl FormArgs {
    /// The form as the JSON object validation expects; only supplied fields are present.
    fn into_json(self) -> Value {
        let fields = [
            ("firstName", self.first_name),
            ("middleName", self.middle_name),
            ("lastName", self.last_name),
            ("dateOfBirth", self.date_of_birth),
            ("status", self.status),
            ("street", self.street),
            ("city", self.city),
            ("state", self.state),
            ("zipCode", self.zip_code),
        ];

        let map: Map<String, Value> = fields
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::String(v))))
            .collect();
        Value::Object(map)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patients_client=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = CoreConfig::new(
        base_url_from_env_value(cli.base_url)?,
        StoreConfig {
            detail_lifecycle: detail_lifecycle_from_env_value(cli.detail_lifecycle)?,
            stale_responses: stale_responses_from_env_value(cli.stale_responses)?,
        },
    )?;

    let Some(command) = cli.command else {
        println!("Use 'patients --help' for commands");
        return Ok(());
    };

    tracing::debug!("using patients backend at {}", cfg.base_url());
    let store = PatientStore::new(HttpPatientApi::new(&cfg)?, cfg.store());

    match command {
        Commands::List { search, status } => {
            if store.fetch_patients().await.is_err() {
                bail!(lifecycle_error(&store, Family::List));
            }
            let state = store.state();
            let shown = filter_patients(&state.patients, &search, status);
            println!("{}", view::render_list(&state.patients, &shown));
        }
        Commands::Show { id } => {
            let family = store.detail_family();
            match store.fetch_patient_by_id(&id).await {
                Ok(fetched) => {
                    let current = store.state().current_patient.clone();
                    println!("{}", view::render_detail(current.as_ref().unwrap_or(&fetched)));
                    store.clear_current_patient();
                }
                Err(_) => bail!(lifecycle_error(&store, family)),
            }
        }
        Commands::Create(form) => {
            let request = match validate_create_patient(&form.into_json()) {
                Ok(request) => request,
                Err(errors) => {
                    eprintln!("{}", view::render_field_errors(&errors));
                    bail!("patient form has {} invalid field(s)", errors.len());
                }
            };

            store.reset_create_state();
            match store.create_patient(&request).await {
                Ok(patient) => {
                    println!(
                        "Created patient {}",
                        patient.id().unwrap_or("(no identifier returned)")
                    );
                    println!("{}", view::render_detail(&patient));
                }
                Err(_) => bail!(lifecycle_error(&store, Family::Create)),
            }
            store.reset_create_state();
        }
        Commands::Update { id, fields } => {
            let patch = match validate_update_patient(&fields.into_json()) {
                Ok(patch) => patch,
                Err(errors) => {
                    eprintln!("{}", view::render_field_errors(&errors));
                    bail!("update has {} invalid field(s)", errors.len());
                }
            };
            if patch.is_empty() {
                bail!("nothing to update: pass at least one field");
            }

            match store.update_patient(&id, &patch).await {
                Ok(patient) => {
                    println!("Updated patient {id}");
                    println!("{}", view::render_detail(&patient));
                }
                Err(err) => bail!(err.user_message(UPDATE_FAILED)),
            }
        }
        Commands::Delete { id } => match store.delete_patient(&id).await {
            Ok(()) => println!("Deleted patient {id}"),
            Err(err) => bail!(
                "{}; the patient was not deleted, try again",
                err.user_message(DELETE_FAILED)
            ),
        },
    }

    Ok(())
}

fn lifecycle_error(store: &PatientStore<HttpPatientApi>, family: Family) -> String {
    store
        .state()
        .lifecycle(family)
        .error
        .clone()
        .unwrap_or_else(|| "request failed".to_string())
}
