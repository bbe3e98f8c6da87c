//! Pure constructors for the standard component types.
//!
//! Each builder takes a fully specified configuration struct; the
//! `Default` impl of every config documents the value used for each field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::component::{ComponentRecord, Map};
use crate::error::ComponentResult;
use crate::validation::FieldRule;

/// Names of the server handlers that built components bind to.
pub mod handlers {
    /// Form submission.
    pub const FORM_SUBMIT: &str = "handle_form_submit";
    /// Single-field validation.
    pub const FIELD_VALIDATION: &str = "handle_field_validation";
    /// Form field change.
    pub const FORM_CHANGE: &str = "handle_form_change";
    /// Table row click.
    pub const ROW_SELECTION: &str = "handle_row_selection";
    /// Table column sort.
    pub const TABLE_SORT: &str = "handle_table_sort";
    /// Table filter.
    pub const TABLE_FILTER: &str = "handle_table_filter";
    /// Notification dismissal.
    pub const NOTIFICATION_CLOSE: &str = "handle_notification_close";
}

/// One input field of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Field name, used as the key in submitted form data.
    pub name: String,
    /// Input type (`text`, `email`, `textarea`, ...).
    #[serde(rename = "type")]
    pub field_type: String,
    /// Visible label.
    pub label: String,
    /// Whether a value is required.
    #[serde(default)]
    pub required: bool,
    /// Placeholder text.
    #[serde(default)]
    pub placeholder: String,
}

/// Form configuration.
#[derive(Debug, Clone)]
pub struct FormConfig {
    /// Fields in display order. Default: none.
    pub fields: Vec<FormField>,
    /// Validation rule per field name. Default: none.
    pub validation: BTreeMap<String, FieldRule>,
    /// Layout hint. Default: `"vertical"`.
    pub layout: String,
    /// Whether the client saves drafts automatically. Default: `false`.
    pub auto_save: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            validation: BTreeMap::new(),
            layout: "vertical".to_string(),
            auto_save: false,
        }
    }
}

/// One column of a data table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Key into each row object.
    pub key: String,
    /// Header text.
    pub title: String,
    /// Whether the column can be sorted.
    #[serde(default)]
    pub sortable: bool,
}

/// Data table configuration.
#[derive(Debug, Clone)]
pub struct DataTableConfig {
    /// Columns. Default: none.
    pub columns: Vec<TableColumn>,
    /// Row objects. Default: none.
    pub data: Vec<Value>,
    /// Rows per page. Default: `10`.
    pub page_size: u32,
    /// Pagination enabled. Default: `true`.
    pub pagination: bool,
    /// Sorting enabled. Default: `true`.
    pub sorting: bool,
    /// Sort by more than one column at once. Default: `false`.
    pub multi_column_sort: bool,
    /// Filtering enabled. Default: `true`.
    pub filtering: bool,
    /// Global search box. Default: `true`.
    pub global_search: bool,
}

impl Default for DataTableConfig {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            data: Vec::new(),
            page_size: 10,
            pagination: true,
            sorting: true,
            multi_column_sort: false,
            filtering: true,
            global_search: true,
        }
    }
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Informational.
    #[default]
    Info,
    /// Success confirmation.
    Success,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

/// Notification configuration.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Message text. Default: empty.
    pub message: String,
    /// Severity. Default: [`NotificationKind::Info`].
    pub kind: NotificationKind,
    /// Display time in milliseconds. Default: `5000`.
    pub duration_ms: u64,
    /// Whether the user can dismiss it. Default: `true`.
    pub closable: bool,
    /// Screen position. Default: `"top-right"`.
    pub position: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            message: String::new(),
            kind: NotificationKind::Info,
            duration_ms: 5000,
            closable: true,
            position: "top-right".to_string(),
        }
    }
}

/// Layout container configuration.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Layout model. Default: `"flex"`.
    pub layout: String,
    /// Main axis. Default: `"column"`.
    pub direction: String,
    /// Gap between children in pixels. Default: `16`.
    pub spacing: u32,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            layout: "flex".to_string(),
            direction: "column".to_string(),
            spacing: 16,
        }
    }
}

/// Text block configuration.
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Text content. Default: empty.
    pub content: String,
    /// Typography variant. Default: `"body"`.
    pub variant: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            content: String::new(),
            variant: "body".to_string(),
        }
    }
}

/// Input configuration.
#[derive(Debug, Clone)]
pub struct InputConfig {
    /// HTML-style input type. Default: `"text"`.
    pub input_type: String,
    /// Placeholder text. Default: empty.
    pub placeholder: String,
    /// Whether a value is required. Default: `false`.
    pub required: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            input_type: "text".to_string(),
            placeholder: String::new(),
            required: false,
        }
    }
}

/// Button configuration.
#[derive(Debug, Clone)]
pub struct ButtonConfig {
    /// Label. Default: empty.
    pub text: String,
    /// Visual variant. Default: `"primary"`.
    pub variant: String,
    /// Size. Default: `"medium"`.
    pub size: String,
    /// Disabled state. Default: `false`.
    pub disabled: bool,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            variant: "primary".to_string(),
            size: "medium".to_string(),
            disabled: false,
        }
    }
}

fn object(value: Value) -> Map {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Builders for the standard component types.
pub struct ComponentBuilder;

impl ComponentBuilder {
    /// Form with submit, validate and change handlers bound.
    pub fn form(id: &str, config: FormConfig) -> ComponentRecord {
        let props = object(json!({
            "fields": config.fields,
            "validation": config.validation,
            "layout": config.layout,
            "auto_save": config.auto_save,
        }));
        ComponentRecord::new("form", id)
            .with_props(props)
            .with_event("on_submit", handlers::FORM_SUBMIT)
            .with_event("on_validate", handlers::FIELD_VALIDATION)
            .with_event("on_change", handlers::FORM_CHANGE)
    }

    /// Paginated, sortable, filterable data table.
    pub fn data_table(id: &str, config: DataTableConfig) -> ComponentRecord {
        let props = object(json!({
            "columns": config.columns,
            "data": config.data,
            "pagination": { "enabled": config.pagination, "page_size": config.page_size },
            "sorting": { "enabled": config.sorting, "multi_column": config.multi_column_sort },
            "filtering": { "enabled": config.filtering, "global_search": config.global_search },
        }));
        ComponentRecord::new("data_table", id)
            .with_props(props)
            .with_event("on_row_click", handlers::ROW_SELECTION)
            .with_event("on_sort", handlers::TABLE_SORT)
            .with_event("on_filter", handlers::TABLE_FILTER)
    }

    /// Transient notification.
    pub fn notification(id: &str, config: NotificationConfig) -> ComponentRecord {
        let props = object(json!({
            "message": config.message,
            "type": config.kind,
            "duration": config.duration_ms,
            "closable": config.closable,
            "position": config.position,
        }));
        ComponentRecord::new("notification", id)
            .with_props(props)
            .with_event("on_close", handlers::NOTIFICATION_CLOSE)
    }

    /// Layout container. Fails if the resulting tree has empty or duplicate ids.
    pub fn container(
        id: &str,
        config: ContainerConfig,
        children: Vec<ComponentRecord>,
    ) -> ComponentResult<ComponentRecord> {
        let props = object(json!({
            "layout": config.layout,
            "direction": config.direction,
            "spacing": config.spacing,
        }));
        let container = ComponentRecord::new("container", id)
            .with_props(props)
            .with_children(children);
        container.validate_tree()?;
        Ok(container)
    }

    /// Static text.
    pub fn text(id: &str, config: TextConfig) -> ComponentRecord {
        let props = object(json!({
            "content": config.content,
            "variant": config.variant,
        }));
        ComponentRecord::new("text", id).with_props(props)
    }

    /// Input bound to a per-component change handler (`<id>_change_handler`).
    pub fn input(id: &str, config: InputConfig) -> ComponentRecord {
        let props = object(json!({
            "input_type": config.input_type,
            "placeholder": config.placeholder,
            "value": "",
            "required": config.required,
        }));
        let binding = object(json!({
            "handler": format!("{id}_change_handler"),
            "payload_schema": { "value": "string", "component_id": "string" },
        }));
        ComponentRecord::new("input", id)
            .with_props(props)
            .with_event_binding("on_change", binding)
    }

    /// Button bound to a per-component click handler (`<id>_click_handler`).
    pub fn button(id: &str, config: ButtonConfig) -> ComponentRecord {
        let props = object(json!({
            "text": config.text,
            "variant": config.variant,
            "size": config.size,
            "disabled": config.disabled,
        }));
        let binding = object(json!({
            "handler": format!("{id}_click_handler"),
            "payload_schema": { "component_id": "string", "timestamp": "string" },
        }));
        ComponentRecord::new("button", id)
            .with_props(props)
            .with_event_binding("on_click", binding)
    }
}
