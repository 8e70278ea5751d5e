pub mod hash_password;
pub mod server;

mod run;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    HashPassword,
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
