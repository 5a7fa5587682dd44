#[cfg(test)]
mod tests {
    use crate::{
        migrations,
        service::migration_chain::{MigrationChain, MigrationConflictError},
        tests::common::{conflicting_roots, step},
    };

    #[test]
    fn embedded_chain_is_linear() {
        let chain = MigrationChain::resolve(&migrations::embedded()).unwrap();

        let ids: Vec<&str> = chain.steps().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["9109c54286d9", "4c2e7a1f9b05"]);
        assert_eq!(chain.head(), Some("4c2e7a1f9b05"));
        assert_eq!(chain.position("9109c54286d9"), Some(0));
        assert_eq!(chain.position("cfac225b1f8c"), None);
    }

    #[test]
    fn steps_are_ordered_by_revision_not_declaration() {
        let steps = vec![
            step("c", Some("b"), "", ""),
            step("a", None, "", ""),
            step("b", Some("a"), "", ""),
        ];

        let chain = MigrationChain::resolve(&steps).unwrap();
        let ids: Vec<&str> = chain.steps().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_set_resolves_to_empty_chain() {
        let chain = MigrationChain::resolve(&[]).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.head(), None);
    }

    #[test]
    fn two_roots_creating_the_same_table_conflict() {
        let result = MigrationChain::resolve(&conflicting_roots());
        assert_eq!(
            result.unwrap_err(),
            MigrationConflictError::MultipleRoots(vec![
                "cfac225b1f8c".to_string(),
                "9109c54286d9".to_string()
            ])
        );
    }

    #[test]
    fn duplicate_ids_conflict() {
        let steps = vec![step("a", None, "", ""), step("a", None, "", "")];
        assert_eq!(
            MigrationChain::resolve(&steps).unwrap_err(),
            MigrationConflictError::DuplicateId("a".to_string())
        );
    }

    #[test]
    fn unknown_parent_conflicts() {
        let steps = vec![step("a", None, "", ""), step("b", Some("zz"), "", "")];
        assert_eq!(
            MigrationChain::resolve(&steps).unwrap_err(),
            MigrationConflictError::MissingParent {
                id: "b".to_string(),
                parent: "zz".to_string()
            }
        );
    }

    #[test]
    fn branches_conflict() {
        let steps = vec![
            step("a", None, "", ""),
            step("b", Some("a"), "", ""),
            step("c", Some("a"), "", ""),
        ];
        assert_eq!(
            MigrationChain::resolve(&steps).unwrap_err(),
            MigrationConflictError::Branch {
                parent: "a".to_string(),
                children: vec!["b".to_string(), "c".to_string()]
            }
        );
    }

    #[test]
    fn cycles_without_root_conflict() {
        let steps = vec![step("a", Some("b"), "", ""), step("b", Some("a"), "", "")];
        assert_eq!(
            MigrationChain::resolve(&steps).unwrap_err(),
            MigrationConflictError::NoRoot(2)
        );
    }

    #[test]
    fn detached_cycle_is_unreachable() {
        let steps = vec![
            step("a", None, "", ""),
            step("b", Some("c"), "", ""),
            step("c", Some("b"), "", ""),
        ];
        assert_eq!(
            MigrationChain::resolve(&steps).unwrap_err(),
            MigrationConflictError::Unreachable(vec!["b".to_string(), "c".to_string()])
        );
    }
}
