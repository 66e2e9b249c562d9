//! Command handlers for the regscout CLI.

pub mod ask;
pub mod partitions;
pub mod search;

pub use ask::AskCommand;
pub use partitions::PartitionsCommand;
pub use search::SearchCommand;

use clap::Args;
use regscout_core::{AppError, AppResult};
use regscout_retrieval::AnswerRequest;

/// Question, product and partition flags shared by `ask` and `search`.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// The question to answer
    pub question: String,

    /// Product the question is about (enables product-specific queries)
    #[arg(long)]
    pub product: Option<String>,

    /// Partition to search; repeat for several (default: all)
    #[arg(long = "partition", value_name = "ID")]
    pub partitions: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryArgs {
    pub fn to_request(&self) -> AppResult<AnswerRequest> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Config("Question must not be empty".to_string()));
        }

        let mut request = AnswerRequest::new(question).with_partitions(self.partitions.clone());
        if let Some(ref product) = self.product {
            request = request.with_product(product.clone());
        }
        Ok(request)
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
