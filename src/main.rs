use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use log::{error, info};
use std::sync::Arc;

use jobtrail::config::Config;
use jobtrail::email::FetchMessagesParams;
use jobtrail::gemini::{GeminiModel, GenerativeModel, MessageClassifier, RoleExtractor};
use jobtrail::gmail::{GmailClient, GmailService, UserCredentials};
use jobtrail::http::build_https_client;
use jobtrail::pipeline::{IngestionPipeline, PipelineReport};
use jobtrail::store::MemoryRoleStore;

#[derive(Parser)]
#[command(name = "jobtrail")]
#[command(about = "Suivi des candidatures à partir de la boîte Gmail")]
#[command(version = "0.1.0")]
struct Args {
    /// Adresse Gmail de l'utilisateur (GMAIL_REFRESH_TOKEN doit être défini)
    #[arg(short, long)]
    user: Option<String>,

    /// Ne récupérer que les emails reçus après cette date (YYYY-MM-DD, par défaut: il y a 7 jours)
    #[arg(short, long)]
    after: Option<NaiveDate>,

    /// Mode dry-run : classification seulement, sans extraction ni sauvegarde
    #[arg(short, long)]
    dry_run: bool,

    /// Afficher les rôles au format JSON
    #[arg(long)]
    json: bool,

    /// Vérifier la configuration sans se connecter
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger le fichier .env s'il existe
    dotenv::dotenv().ok();

    // Parser les arguments CLI
    let args = Args::parse();

    // Initialiser le logging
    env_logger::init();

    if args.dry_run {
        info!("🧪 Démarrage en mode DRY-RUN de jobtrail");
    } else {
        info!("🚀 Démarrage de jobtrail");
    }

    // Charger la configuration
    let config = Config::new()?;

    // Si demandé, vérifier seulement la configuration
    if args.check_config {
        println!("✅ Configuration valide !");
        println!("📧 Gmail API OAuth2 (client {})", config.google.client_id);
        println!(
            "⏱️  Limite: {} requêtes / {} ms, pages de {}",
            config.gmail.get_message_rate_limit,
            config.gmail.rate_limit_window_ms,
            config.gmail.page_size()
        );
        println!("🤖 Modèle Gemini: {}", config.gemini.model);
        return Ok(());
    }

    let user = args
        .user
        .clone()
        .context("--user est requis (adresse Gmail de l'utilisateur)")?;
    let refresh_token = std::env::var("GMAIL_REFRESH_TOKEN")
        .context("GMAIL_REFRESH_TOKEN doit être défini pour l'utilisateur")?;
    let after_date = args
        .after
        .unwrap_or_else(|| (Utc::now() - Duration::days(7)).date_naive());

    match run(&config, &args, user, refresh_token, after_date).await {
        Ok(report) => {
            print_report(&report, args.json)?;
            if args.dry_run {
                info!(
                    "✅ Analyse dry-run terminée. {} emails analysés, {} liés à une candidature.",
                    report.fetched, report.classified
                );
            } else {
                info!(
                    "✅ Traitement terminé. {} emails traités, {} rôles enregistrés.",
                    report.fetched,
                    report.roles.len()
                );
            }
        }
        Err(e) => {
            error!("❌ Erreur lors du traitement des emails: {:#}", e);
            return Err(e);
        }
    }

    Ok(())
}

async fn run(
    config: &Config,
    args: &Args,
    user: String,
    refresh_token: String,
    after_date: NaiveDate,
) -> Result<PipelineReport> {
    let client = build_https_client().context("Unable to build HTTPS client")?;

    let credentials = UserCredentials {
        email: user.clone(),
        refresh_token,
    };
    let gmail = GmailClient::connect(client.clone(), &config.google, &credentials).await?;
    let provider = Arc::new(GmailService::new(gmail, config.gmail.clone()));

    let model: Arc<dyn GenerativeModel> = Arc::new(GeminiModel::new(client, config.gemini.clone()));
    let store = Arc::new(MemoryRoleStore::new());

    let pipeline = IngestionPipeline::new(
        provider,
        MessageClassifier::new(model.clone()),
        RoleExtractor::new(model),
        store,
    )
    .dry_run(args.dry_run);

    let report = pipeline.run(&user, &FetchMessagesParams { after_date }).await?;
    Ok(report)
}

fn print_report(report: &PipelineReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.roles)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!(
        "📬 {} emails récupérés, {} liés à une candidature, {} rôles",
        report.fetched,
        report.classified,
        report.roles.len()
    );
    println!("{}", "=".repeat(80));

    for role in &report.roles {
        let previous = role
            .last_status
            .map(|status| format!(" (avant: {})", status))
            .unwrap_or_default();
        println!(
            "💼 {} @ {} - {}{} [{:.0}%]",
            role.title,
            role.company.name,
            role.status,
            previous,
            role.status_confidence * 100.0
        );
        if let Some(requisition) = &role.requisition_number {
            println!("   🔖 Réf: {}", requisition);
        }
        for contact in &role.contacts {
            println!("   👤 {} <{}>", contact.name, contact.email);
        }
    }

    Ok(())
}
