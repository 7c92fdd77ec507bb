use clap::{Args, Subcommand};

pub mod generate;
pub mod list;
pub mod recover;
pub mod set_default;
pub mod show;

use crate::op::Op;

crate::command_enum! {
    (Generate, generate::Generate),
    (List, list::List),
    (Show, show::Show),
    (SetDefault, set_default::SetDefault),
    (Recover, recover::Recover),
}

pub type KeyCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Key {
    #[command(subcommand)]
    pub command: KeyCommand,
}

#[async_trait::async_trait]
impl Op for Key {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

/// Errors shared by the key subcommands
#[derive(Debug, thiserror::Error)]
pub enum KeyOpError {
    #[error(transparent)]
    State(#[from] crate::state::StateError),
    #[error(transparent)]
    Storage(#[from] common::storage::SecretStorageError),
    #[error(transparent)]
    KeyMaterial(#[from] crate::ops::key_material::KeyMaterialError),
    #[error("key {0} not found")]
    NotFound(String),
}
