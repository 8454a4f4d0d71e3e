//! Built-in bulk actions.

mod delete;
mod export;

pub use delete::DeleteSelected;
pub use export::{ExportCsv, CSV_CONTENT_TYPE};

pub const DELETE_SELECTED: &str = "delete_selected";
pub const EXPORT_CSV: &str = "export_csv";

#[cfg(test)]
pub(crate) mod testing {
    use crate::action::{ActionContext, Confirmation, Transport};
    use crate::model::ModelConfig;
    use crate::permission::{AllowAll, Caller, Operation, PermissionTable, Permissions, ANY_CALLER};
    use crate::record::Record;
    use crate::render::BuiltinRenderer;
    use crate::store::MemoryStore;
    use crate::token::TokenSigner;

    pub(crate) fn book_model() -> ModelConfig {
        let mut model = ModelConfig::new("book");
        model.label_field = Some("title".into());
        model.fields = vec!["title".into(), "author".into(), "pages".into()];
        model.list_display = vec!["title".into(), "author".into()];
        model
    }

    pub(crate) fn book_records() -> Vec<Record> {
        vec![
            Record::new(7)
                .with_field("title", "Dune")
                .with_field("author", "Herbert")
                .with_field("pages", 412),
            Record::new(9)
                .with_field("title", "Emma")
                .with_field("author", "Austen")
                .with_field("pages", 474),
            Record::new(12)
                .with_field("title", "Ubik, Revised")
                .with_field("author", "Dick")
                .with_field("pages", 202),
        ]
    }

    pub(crate) struct Fixture {
        pub caller: Caller,
        pub model: ModelConfig,
        pub store: MemoryStore,
        pub permissions: Box<dyn Permissions>,
        pub renderer: BuiltinRenderer,
        pub signer: TokenSigner,
    }

    impl Fixture {
        pub fn books() -> Self {
            Self {
                caller: Caller::new("admin"),
                model: book_model(),
                store: MemoryStore::new().with_records("book", book_records()),
                permissions: Box::new(AllowAll),
                renderer: BuiltinRenderer,
                signer: TokenSigner::new("test-secret-key"),
            }
        }

        pub fn read_only(mut self) -> Self {
            self.permissions =
                Box::new(PermissionTable::new().grant(ANY_CALLER, &[Operation::View]));
            self
        }

        pub fn ctx(&self, confirmation: Confirmation, transport: Transport) -> ActionContext<'_> {
            ActionContext::new(
                &self.caller,
                &self.model,
                super::DELETE_SELECTED,
                confirmation,
                transport,
                "umin",
                &self.store,
                self.permissions.as_ref(),
                &self.renderer,
                &self.signer,
            )
        }
    }
}
