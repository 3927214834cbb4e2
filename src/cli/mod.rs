//! Interface de linha de comando do Eleitoral.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Eleitoral - núcleo de eleições de conselho.
#[derive(Parser, Debug)]
#[command(name = "eleitoral")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Arquivo de configuração.
    #[arg(short, long, default_value = "eleitoral.toml")]
    pub config: PathBuf,

    /// Modo verbose.
    #[arg(short, long)]
    pub verbose: bool,

    /// Modo silencioso.
    #[arg(short, long)]
    pub quiet: bool,

    /// Comando a executar.
    #[command(subcommand)]
    pub command: Commands,
}

/// Comandos disponíveis.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inicializa configuração no diretório atual.
    Init {
        /// Diretório de destino (padrão: diretório atual).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Mostra a configuração efetiva.
    Config,

    /// Diagnostica problemas de configuração.
    Doctor,

    /// Mostra versão.
    Version,

    /// Apura um lote de votos em JSON.
    Tally {
        /// Arquivo com o lote de votos.
        votes: PathBuf,

        /// Arquivo JSON com as chapas aptas (padrão: chapas citadas no lote).
        #[arg(short, long)]
        slates: Option<PathBuf>,

        /// Saída em JSON.
        #[arg(long)]
        json: bool,
    },

    /// Lista prazos vencidos ainda abertos.
    Sweep {
        /// Saída em JSON.
        #[arg(long)]
        json: bool,
    },
}
