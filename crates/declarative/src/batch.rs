//! Grouping specs into command invocations

use crate::types::Spec;

/// Specs sharing one flag set, installed or removed with one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<'a> {
    pub flags: Vec<String>,
    pub specs: Vec<&'a Spec>,
}

/// Split specs into invocations
///
/// When every spec yields the same flags the result is a single batch.
/// As soon as flags differ (say one snap needs `--classic`), every spec gets
/// its own invocation.
pub fn batch_by_flags<'a, F>(specs: &'a [Spec], flags_of: F) -> Vec<Batch<'a>>
where
    F: Fn(&Spec) -> Vec<String>,
{
    let flags: Vec<Vec<String>> = specs.iter().map(&flags_of).collect();

    let homogeneous = flags.windows(2).all(|w| w[0] == w[1]);
    if homogeneous {
        return match flags.into_iter().next() {
            Some(flags) => vec![Batch {
                flags,
                specs: specs.iter().collect(),
            }],
            None => Vec::new(),
        };
    }

    specs
        .iter()
        .zip(flags)
        .map(|(spec, flags)| Batch {
            flags,
            specs: vec![spec],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Record, Value};

    fn classic_flag(spec: &Spec) -> Vec<String> {
        match spec.field("name", "classic") {
            Some(Value::Bool(true)) => vec!["--classic".to_string()],
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_empty() {
        assert!(batch_by_flags(&[], classic_flag).is_empty());
    }

    #[test]
    fn test_homogeneous_single_batch() {
        let specs: Vec<Spec> = vec!["jq".into(), "htop".into(), "curl".into()];
        let batches = batch_by_flags(&specs, classic_flag);

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].specs.len(), 3);
        assert!(batches[0].flags.is_empty());
    }

    #[test]
    fn test_mixed_flags_one_per_entity() {
        let specs: Vec<Spec> = vec![
            "jq".into(),
            Spec::from(Record::new().with("name", "code").with("classic", true)),
            "htop".into(),
        ];
        let batches = batch_by_flags(&specs, classic_flag);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].flags, vec!["--classic".to_string()]);
        assert!(batches[2].flags.is_empty());
    }
}
