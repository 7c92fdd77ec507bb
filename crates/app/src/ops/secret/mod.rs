use clap::{Args, Subcommand};

pub mod algorithms;
pub mod get;
pub mod store;

use crate::op::Op;

crate::command_enum! {
    (Store, store::Store),
    (Get, get::Get),
    (Algorithms, algorithms::Algorithms),
}

pub type SecretCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Secret {
    #[command(subcommand)]
    pub command: SecretCommand,
}

#[async_trait::async_trait]
impl Op for Secret {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

/// Errors shared by the secret subcommands
#[derive(Debug, thiserror::Error)]
pub enum SecretOpError {
    #[error(transparent)]
    State(#[from] crate::state::StateError),
    #[error(transparent)]
    Storage(#[from] common::storage::SecretStorageError),
    #[error(transparent)]
    KeyMaterial(#[from] crate::ops::key_material::KeyMaterialError),
}
