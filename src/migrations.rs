use crate::models::migration::MigrationStep;

/// The migration chain shipped with this binary, root first.
pub fn embedded() -> Vec<MigrationStep> {
    vec![
        MigrationStep {
            id: "9109c54286d9",
            down_revision: None,
            description: "create policies table",
            upgrade: include_str!("../migrations/9109c54286d9_create_policies_table.up.sql"),
            downgrade: include_str!("../migrations/9109c54286d9_create_policies_table.down.sql"),
        },
        MigrationStep {
            id: "4c2e7a1f9b05",
            down_revision: Some("9109c54286d9"),
            description: "index policies by name",
            upgrade: include_str!("../migrations/4c2e7a1f9b05_index_policies_name.up.sql"),
            downgrade: include_str!("../migrations/4c2e7a1f9b05_index_policies_name.down.sql"),
        },
    ]
}
