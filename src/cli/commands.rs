//! Implementação dos comandos CLI do Eleitoral.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::service::ElectoralCore;
use crate::store::SqliteStore;
use crate::tally::{Anomaly, BallotChoice, EligibleSlate, MemoryVoteSource, VoteAggregator, VoteBatch};
use crate::types::config::Config;
use crate::EleitoralResult;

/// Initializes configuration in the specified directory.
pub async fn init(path: Option<PathBuf>) -> EleitoralResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join("eleitoral.toml");

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        println!("Use 'eleitoral config' to inspect it.");
        return Ok(());
    }

    // Create .eleitoral/ directory for the database
    let data_dir = target_dir.join(".eleitoral");
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!(".eleitoral/ directory created");
    }

    update_gitignore(&target_dir)?;

    let config = Config::default_config();
    config.save(&config_path)?;

    println!("Eleitoral initialized successfully!");
    println!("Configuration created at: {}", config_path.display());
    println!("Data directory: .eleitoral/");
    println!();
    println!("Next steps:");
    println!("  1. Review deadlines and mandatory roles: eleitoral config");
    println!("  2. Check the setup: eleitoral doctor");

    Ok(())
}

/// Updates or creates .gitignore to include .eleitoral/
fn update_gitignore(target_dir: &Path) -> EleitoralResult<()> {
    let gitignore_path = target_dir.join(".gitignore");
    let entry = ".eleitoral/";
    let comment = "# Eleitoral - local database";

    if gitignore_path.exists() {
        let content = std::fs::read_to_string(&gitignore_path)?;

        if content.lines().any(|line| line.trim() == entry || line.trim() == ".eleitoral") {
            tracing::debug!(".gitignore already contains .eleitoral/");
            return Ok(());
        }

        let mut new_content = content.trim_end().to_string();
        if !new_content.is_empty() {
            new_content.push_str("\n\n");
        }
        new_content.push_str(comment);
        new_content.push('\n');
        new_content.push_str(entry);
        new_content.push('\n');

        std::fs::write(&gitignore_path, new_content)?;
        println!(".gitignore updated with .eleitoral/");
    } else {
        let content = format!("{}\n{}\n", comment, entry);
        std::fs::write(&gitignore_path, content)?;
        println!(".gitignore created with .eleitoral/");
    }

    Ok(())
}

/// Mostra a configuração efetiva em TOML.
pub fn show_config(config: &Config) -> EleitoralResult<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Diagnostica problemas de configuração.
pub async fn doctor(config_path: &Path, config: &Config) -> EleitoralResult<()> {
    println!("Diagnosticando configuração do Eleitoral...\n");

    let mut issues: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if config_path.exists() {
        match Config::load(config_path) {
            Ok(_) => println!("✓ Configuração carregada de {}", config_path.display()),
            Err(e) => issues.push(format!("{} inválido: {}", config_path.display(), e)),
        }
    } else {
        warnings.push(format!(
            "{} não encontrado - usando valores padrão",
            config_path.display()
        ));
    }

    if let Err(e) = config.validate() {
        issues.push(e.to_string());
    }

    let d = &config.deadlines;
    println!(
        "✓ Prazos: defesa {}d, alegações {}d, contra-alegações {}d, recurso {}d",
        d.defense_days, d.allegations_days, d.counter_allegations_days, d.appeal_days
    );

    if config.candidacy.mandatory_roles.is_empty() {
        warnings.push("Nenhum cargo obrigatório configurado - qualquer chapa pode ser registrada".to_string());
    } else {
        let roles: Vec<String> = config
            .candidacy
            .mandatory_roles
            .iter()
            .map(|r| r.to_string())
            .collect();
        println!("✓ Cargos obrigatórios: {}", roles.join(", "));
    }

    if config.storage.enabled {
        match SqliteStore::open(&config.storage.db_path) {
            Ok(_) => println!(
                "✓ Banco de dados acessível em {}",
                config.storage.db_path.display()
            ),
            Err(e) => issues.push(format!("Banco de dados inacessível: {}", e)),
        }
    } else {
        warnings.push("Persistência desabilitada - dados ficam apenas em memória".to_string());
    }

    // Resumo
    println!();
    if issues.is_empty() && warnings.is_empty() {
        println!("✓ Tudo OK! Eleitoral está pronto para uso.");
    } else {
        if !warnings.is_empty() {
            println!("Avisos:");
            for warning in warnings {
                println!("  ⚠ {}", warning);
            }
        }
        if !issues.is_empty() {
            println!("Problemas:");
            for issue in issues {
                println!("  ✗ {}", issue);
            }
        }
    }

    Ok(())
}

/// Mostra versão.
pub fn version() {
    println!("eleitoral {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Núcleo de eleições de conselho");
}

/// Apura um lote de votos fora do fluxo persistido.
pub fn tally(
    votes_path: &Path,
    slates_path: Option<&Path>,
    json: bool,
    config: &Config,
) -> EleitoralResult<()> {
    let batch = VoteBatch::load(votes_path)?;
    let slates = match slates_path {
        Some(path) => serde_json::from_str::<Vec<EligibleSlate>>(&std::fs::read_to_string(path)?)?,
        None => slates_in_batch(&batch),
    };

    let aggregation = VoteAggregator::aggregate(
        &batch.election_id,
        &batch.records,
        &slates,
        &BTreeSet::new(),
        batch.electorate_size,
        config.tally.decimal_places,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&aggregation)?);
        return Ok(());
    }

    println!("Eleição: {}", batch.election_id);
    println!(
        "Total: {} | válidos: {} | brancos: {} | nulos: {} | anulados: {}",
        aggregation.total, aggregation.valid, aggregation.blank, aggregation.null, aggregation.voided
    );
    if let Some(turnout) = aggregation.turnout {
        println!("Comparecimento: {:.2}%", turnout);
    }
    println!();

    for (position, slate) in aggregation.slates.iter().enumerate() {
        println!(
            "  {:>2}. [{}] {} - {} voto(s) ({:.2}%)",
            position + 1,
            slate.number,
            slate.name,
            slate.votes,
            slate.percentage
        );
    }

    if !aggregation.anomalies.is_empty() {
        println!();
        println!("Irregularidades:");
        for anomaly in &aggregation.anomalies {
            match anomaly {
                Anomaly::IneligibleSlate { ballot_id, slate_id } => {
                    println!("  ⚠ cédula {} votou em chapa não apta ({})", ballot_id, slate_id)
                }
                Anomaly::DuplicateBallot { ballot_id } => {
                    println!("  ⚠ cédula {} repetida", ballot_id)
                }
            }
        }
    }

    println!();
    let declared = batch.declared();
    if aggregation.total != declared {
        println!(
            "✗ Apuração incompleta: {} de {} voto(s) declarados",
            aggregation.total, declared
        );
    }
    match aggregation.clear_winner() {
        Some(winner) => println!("✓ Vencedora: [{}] {}", winner.number, winner.name),
        None if aggregation.slates.is_empty() => println!("⚠ Nenhuma chapa elegível"),
        None => {
            let tied: Vec<String> = aggregation
                .top_slates()
                .iter()
                .map(|s| format!("[{}] {}", s.number, s.name))
                .collect();
            println!("⚠ Empate sem vencedor definido: {}", tied.join(", "));
        }
    }
    println!("Digest: {}", aggregation.digest);

    Ok(())
}

/// Chapas citadas no lote, numeradas na ordem em que aparecem.
fn slates_in_batch(batch: &VoteBatch) -> Vec<EligibleSlate> {
    let mut slates: Vec<EligibleSlate> = Vec::new();
    for record in &batch.records {
        if let BallotChoice::Slate(id) = &record.choice {
            if !slates.iter().any(|s| &s.id == id) {
                slates.push(EligibleSlate {
                    id: id.clone(),
                    number: slates.len() as u32 + 1,
                    name: id.clone(),
                });
            }
        }
    }
    slates
}

/// Lista janelas de manifestação vencidas no banco configurado.
pub async fn sweep(json: bool, config: &Config) -> EleitoralResult<()> {
    let core = ElectoralCore::open(config.clone(), Arc::new(MemoryVoteSource::new()))?;
    let expired = core.sweep_expired().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&expired)?);
        return Ok(());
    }

    if expired.is_empty() {
        println!("Nenhum prazo vencido em aberto.");
        return Ok(());
    }

    println!("{} prazo(s) vencido(s) em aberto:\n", expired.len());
    for window in &expired {
        println!(
            "  {} {} ({}) - {} venceu em {}",
            window.kind,
            window.process_id,
            window.election_id,
            window.round,
            window.due_at.to_rfc3339()
        );
    }
    println!();
    println!("Use close_round para encerrar cada janela.");

    Ok(())
}
