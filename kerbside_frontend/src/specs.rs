use crate::models::Specification;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecPair {
    pub name: String,
    pub value: String,
}

/// Ordered, index-addressable list of free-form name/value pairs. The list
/// may be emptied while editing; blank pairs are dropped at submission time.
#[derive(Debug, Clone, Default)]
pub struct SpecEditor {
    pairs: Vec<SpecPair>,
}

impl SpecEditor {
    pub fn from_existing(rows: &[Specification]) -> Self {
        Self {
            pairs: rows
                .iter()
                .map(|row| SpecPair {
                    name: row.name.clone(),
                    value: row.value.clone(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn append_blank(&mut self) {
        self.pairs.push(SpecPair::default());
    }

    pub fn pair_mut(&mut self, index: usize) -> Option<&mut SpecPair> {
        self.pairs.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) {
        if index < self.pairs.len() {
            self.pairs.remove(index);
        }
    }

    /// Pairs that survive submission: trimmed, and both fields non-empty.
    pub fn cleaned(&self) -> Vec<SpecPair> {
        self.pairs
            .iter()
            .map(|pair| SpecPair {
                name: pair.name.trim().to_string(),
                value: pair.value.trim().to_string(),
            })
            .filter(|pair| !pair.name.is_empty() && !pair.value.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blank_pairs_are_dropped_at_submission() {
        let mut editor = SpecEditor::default();
        editor.append_blank();
        editor.append_blank();
        editor.pair_mut(0).expect("pair").value = "red".into();
        *editor.pair_mut(1).expect("pair") = SpecPair {
            name: "Color".into(),
            value: "Blue".into(),
        };
        let cleaned = editor.cleaned();
        assert_eq!(
            cleaned,
            vec![SpecPair {
                name: "Color".into(),
                value: "Blue".into(),
            }]
        );
    }

    #[test]
    fn cleaned_trims_whitespace() {
        let mut editor = SpecEditor::default();
        editor.append_blank();
        *editor.pair_mut(0).expect("pair") = SpecPair {
            name: "  Brand ".into(),
            value: " Acme ".into(),
        };
        assert_eq!(editor.cleaned()[0].name, "Brand");
        assert_eq!(editor.cleaned()[0].value, "Acme");
    }

    #[test]
    fn remove_targets_the_given_index_and_allows_reaching_zero() {
        let mut editor = SpecEditor::default();
        editor.append_blank();
        editor.append_blank();
        editor.pair_mut(0).expect("pair").name = "first".into();
        editor.pair_mut(1).expect("pair").name = "second".into();

        editor.remove(0);
        assert_eq!(editor.len(), 1);
        assert_eq!(editor.pair_mut(0).expect("pair").name, "second");

        editor.remove(0);
        assert!(editor.is_empty());
        // Out-of-range removal is a no-op.
        editor.remove(5);
    }

    #[test]
    fn existing_rows_preload_in_order() {
        let rows = vec![
            Specification {
                id: None,
                listing_id: "l1".into(),
                name: "Brand".into(),
                value: "Acme".into(),
            },
            Specification {
                id: None,
                listing_id: "l1".into(),
                name: "Brand".into(),
                value: "Duplicate allowed".into(),
            },
        ];
        let editor = SpecEditor::from_existing(&rows);
        assert_eq!(editor.len(), 2);
        assert_eq!(editor.cleaned().len(), 2);
    }
}
