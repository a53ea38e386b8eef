use serde::{Deserialize, Serialize};

use crate::insights::MetaValueCounts;

pub const SYSTEM_MESSAGE: &str = "You will be given metadata about a CSV file: its name, \
its row count, one of its categorical ('meta') columns with the number of occurrences of \
each distinct value, and the names of its other categorical columns.
Describe what the file most likely contains and how these breakdowns could be used for \
further analysis.
Keep the answer short but meaningful, and answer directly without restating the question.";

/// Message pair handed to a downstream language model. Never sent from here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnPrompt {
    pub system_message: String,
    pub user_message: String,
}

pub fn build_column_prompt(
    filename: &str,
    rows_count: u64,
    column: &MetaValueCounts,
    other_meta_columns: &[String],
) -> ColumnPrompt {
    let value_lines = column
        .value_counts
        .iter()
        .map(|v| format!("'{}': {} occurrences", v.value, v.count))
        .collect::<Vec<_>>()
        .join("\n");

    let others = if other_meta_columns.is_empty() {
        "The file has no other meta columns.".to_string()
    } else {
        format!(
            "The other meta columns are: {}.",
            other_meta_columns.join(", ")
        )
    };

    let user_message = format!(
        "I have a file named '{}' containing {} rows.\n\
         One of its meta columns is '{}', with these distinct values:\n{}\n\
         {}\n\
         Based on this, describe the file and suggest how these metrics can drive further analysis.",
        filename, rows_count, column.header, value_lines, others
    );

    ColumnPrompt {
        system_message: SYSTEM_MESSAGE.to_string(),
        user_message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::ValueCount;

    fn status_counts() -> MetaValueCounts {
        MetaValueCounts {
            header: "status".to_string(),
            column_index: 0,
            value_counts: vec![
                ValueCount {
                    value: "open".to_string(),
                    count: 7,
                },
                ValueCount {
                    value: "closed".to_string(),
                    count: 5,
                },
            ],
        }
    }

    #[test]
    fn user_message_lists_values_and_other_columns() {
        let prompt = build_column_prompt(
            "tickets.csv",
            12,
            &status_counts(),
            &["region".to_string(), "priority".to_string()],
        );

        assert_eq!(prompt.system_message, SYSTEM_MESSAGE);
        assert!(prompt.user_message.contains("'tickets.csv' containing 12 rows"));
        assert!(prompt.user_message.contains("'open': 7 occurrences\n'closed': 5 occurrences"));
        assert!(prompt
            .user_message
            .contains("The other meta columns are: region, priority."));
    }

    #[test]
    fn mentions_when_there_are_no_other_meta_columns() {
        let prompt = build_column_prompt("tickets.csv", 12, &status_counts(), &[]);
        assert!(prompt.user_message.contains("no other meta columns"));
    }
}
