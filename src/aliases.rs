// Known duplicate subject IDs.
//
// Two infants were logged under two IDs each. The dashboard reports them as
// separate subjects unless the caller opts in to merging.
use crate::types::SampleRow;
use std::collections::HashMap;
use tracing::info;

/// (kept ID, alias folded into it)
pub const KNOWN_ALIAS_PAIRS: [(&str, &str); 2] = [("NB00405", "NB00406"), ("NB00467", "NB00438")];

#[derive(Debug, Clone, Default)]
pub struct SubjectAliases {
    alias_to_primary: HashMap<String, String>,
}

impl SubjectAliases {
    pub fn known() -> Self {
        Self::from_pairs(KNOWN_ALIAS_PAIRS)
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let alias_to_primary = pairs
            .into_iter()
            .map(|(primary, alias)| (alias.to_string(), primary.to_string()))
            .collect();
        SubjectAliases { alias_to_primary }
    }

    pub fn caveat(&self) -> String {
        let mut pairs: Vec<String> = self
            .alias_to_primary
            .iter()
            .map(|(alias, primary)| format!("`{}` and `{}`", primary, alias))
            .collect();
        pairs.sort();
        format!(
            "Note: {} are the same subject logged under two IDs.",
            pairs.join(", ")
        )
    }

    /// Copy of `data` with every alias ID rewritten to its primary.
    pub fn merge(&self, data: &[SampleRow]) -> Vec<SampleRow> {
        let mut rewritten = 0usize;
        let out: Vec<SampleRow> = data
            .iter()
            .map(|r| match self.alias_to_primary.get(&r.subject_id) {
                Some(primary) => {
                    rewritten += 1;
                    SampleRow {
                        subject_id: primary.clone(),
                        ..r.clone()
                    }
                }
                None => r.clone(),
            })
            .collect();
        info!(rewritten, "merged aliased subject IDs");
        out
    }
}
