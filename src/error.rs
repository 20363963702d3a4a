//! The classified error catalog and console report assembly.
//!
//! Structural failures (a missing bridge attribute, a widget that cannot be loaded) are
//! "classified": looked up by numeric id in a fixed catalog and rendered as a multi-section
//! console report. Reports are immutable values built from an [`ErrorContext`]; the catalog
//! itself is never mutated.

/// Visual separator between report sections.
pub const BANNER: &str = "#######################################";

/// Class added to the controller element on any classified failure.
pub const COMPONENT_ERROR_CLASS: &str = "bitty-component-error";

/// Class added when the failure identifies a specific offending element.
pub const ELEMENT_ERROR_CLASS: &str = "bitty-element-error";

/// One catalog entry. `description` and `kind` paragraphs may carry the placeholder tokens
/// `__UUID__`, `__ERROR_ID__` and `__MODULE_PATH__`, substituted from the [`ErrorContext`] when
/// a report is assembled.
pub struct ErrorSpec {
    pub id: u16,
    pub kind: &'static [&'static str],
    pub description: &'static [&'static str],
    /// One or more solution options, each a list of paragraphs.
    pub help: &'static [&'static [&'static str]],
    pub developer_note: &'static [&'static str],
}

static CATALOG: [ErrorSpec; 5] = [
    ErrorSpec {
        id: 0,
        kind: &["Not Classified"],
        description: &["An unclassified error occurred."],
        help: &[&[
            "Detailed help isn't available since this error is unclassified.",
            "Use the line numbers from the error console to locate the source of the error and work from there.",
        ]],
        developer_note: &[
            "Use an ID from the bitty error catalog to classify this error.",
            "It's a bug if there's no appropriate classification. Please open an issue if you find an error without a clear mapping.",
        ],
    },
    ErrorSpec {
        id: 1,
        kind: &["Invalid Error ID"],
        description: &[
            "An attempt to call an error with an ID of '__ERROR_ID__' was made. That ID does not exist in the error catalog.",
        ],
        help: &[
            &["Change the ID to one that's available in the error catalog."],
            &[
                "Create a custom error with the ID you're attempting to use.",
                "NOTE: Custom error IDs should be above 9000 by convention.",
            ],
        ],
        developer_note: &[],
    },
    ErrorSpec {
        id: 2,
        kind: &["A <bitty-js></bitty-js> element is missing its 'data-bridge' attribute"],
        description: &[
            "Every <bitty-js></bitty-js> element requires a 'data-bridge' attribute that connects it to the module that powers its functionality.",
            "The 'data-bridge' attribute is missing from the <bitty-js></bitty-js> element with the 'data-uuid' attribute:",
            "__UUID__",
        ],
        help: &[&[
            "Add a 'data-bridge' attribute to the <bitty-js></bitty-js> tag with the path to its supporting module. For example:",
            "<bitty-js data-bridge=\"./path/to/module.js\"></bitty-js>",
        ]],
        developer_note: &[],
    },
    ErrorSpec {
        id: 3,
        kind: &["Could not load default class from:", "__MODULE_PATH__"],
        description: &[
            "The <bitty-js> element with 'data-uuid':",
            "__UUID__",
            "does not have a 'data-app' attribute. Therefore, it attempted to load the default class exported from:",
            "__MODULE_PATH__",
            "That attempt failed.",
        ],
        help: &[
            &["Make sure the __MODULE_PATH__ module registers a default export."],
            &["If the module has a default export, something went wrong with it. Examine it further to trace the issue."],
            &["Add a 'data-app' attribute to the <bitty-js> element with the name of a class exported from __MODULE_PATH__."],
        ],
        developer_note: &[],
    },
    ErrorSpec {
        id: 4,
        kind: &["Could not load widget"],
        description: &["The widget could not be loaded from the module."],
        help: &[
            &["Check to make sure the value of the 'data-widget' attribute in your <bitty-js></bitty-js> element matches a class that's exported from the module."],
            &["Make sure the class in your module is registered as an export."],
        ],
        developer_note: &[],
    },
];

/// Look up a catalog entry by id.
pub fn lookup(id: u16) -> Option<&'static ErrorSpec> {
    CATALOG.iter().find(|spec| spec.id == id)
}

/// The offending element identified by a classified failure, when there is one.
#[derive(Debug, Clone)]
pub struct ElementDetails {
    pub tag: String,
    pub uuid: String,
}

/// Everything known about one error occurrence. A fresh context is built per occurrence; the
/// report derives entirely from it.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub id: u16,
    pub component_uuid: String,
    pub module_path: Option<String>,
    pub element: Option<ElementDetails>,
    pub additional_details: Option<String>,
}

impl ErrorContext {
    pub fn new(id: u16, component_uuid: impl Into<String>) -> Self {
        Self {
            id,
            component_uuid: component_uuid.into(),
            module_path: None,
            element: None,
            additional_details: None,
        }
    }

    pub fn with_module_path(mut self, path: impl Into<String>) -> Self {
        self.module_path = Some(path.into());
        self
    }

    pub fn with_element(mut self, element: ElementDetails) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_additional_details(mut self, details: impl Into<String>) -> Self {
        self.additional_details = Some(details.into());
        self
    }
}

/// An assembled diagnostic. Unknown ids fall back to the catalog's "Invalid Error ID" entry
/// while still reporting the id that was requested.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub id: u16,
    sections: Vec<String>,
}

impl ErrorReport {
    pub fn new(ctx: &ErrorContext) -> Self {
        let spec = lookup(ctx.id).unwrap_or(&CATALOG[1]);
        let mut sections = Vec::new();

        sections.push(substitute(
            ctx,
            format!(
                "{BANNER}\n\nA BITTY ERROR OCCURRED [ID: {}]\n\n{}",
                ctx.id,
                paragraphs(spec.kind)
            ),
        ));
        sections.push(substitute(
            ctx,
            format!("DESCRIPTION:\n\n{}", paragraphs(spec.description)),
        ));
        if let Some(details) = &ctx.additional_details {
            sections.push(substitute(ctx, format!("ADDITIONAL DETAILS:\n\n{details}")));
        }
        sections.push(substitute(ctx, help_section(spec.help)));
        if !spec.developer_note.is_empty() {
            sections.push(substitute(
                ctx,
                format!("DEVELOPER NOTE:\n\n{}", paragraphs(spec.developer_note)),
            ));
        }
        sections.push(substitute(ctx, component_section(&ctx.component_uuid)));
        if let Some(element) = &ctx.element {
            sections.push(substitute(ctx, element_section(element)));
        }

        Self {
            id: ctx.id,
            sections,
        }
    }

    /// The full report text, sections joined by the separator banner.
    pub fn to_console_text(&self) -> String {
        self.sections.join(&format!("\n\n{BANNER}\n\n"))
    }
}

fn paragraphs(content: &[&str]) -> String {
    content.join("\n\n")
}

fn help_section(help: &[&[&str]]) -> String {
    let mut out = Vec::new();

    if help.len() == 1 {
        out.push("POSSIBLE SOLUTION:".to_string());
        out.push(paragraphs(help[0]));
    } else {
        out.push("POSSIBLE SOLUTIONS:".to_string());
        for (index, option) in help.iter().enumerate() {
            for (position, paragraph) in option.iter().enumerate() {
                if position == 0 {
                    out.push(format!("{}. {paragraph}", index + 1));
                } else {
                    out.push((*paragraph).to_string());
                }
            }
        }
    }

    out.join("\n\n")
}

fn component_section(uuid: &str) -> String {
    [
        "COMPONENT:",
        "This error was caught by the <bitty-js> element with a 'data-uuid' of:",
        uuid,
        "('data-uuid' attributes are added dynamically. They should be visible in the 'Elements' view in your browser's developer console.)",
    ]
    .join("\n\n")
}

fn element_section(element: &ElementDetails) -> String {
    [
        "ERROR ELEMENT DETAILS:".to_string(),
        format!(
            "The element with the error is a {} tag with a 'data-uuid' attribute of:",
            element.tag
        ),
        element.uuid.clone(),
    ]
    .join("\n\n")
}

fn substitute(ctx: &ErrorContext, content: String) -> String {
    let content = content
        .replace("__UUID__", &ctx.component_uuid)
        .replace("__ERROR_ID__", &ctx.id.to_string());

    match &ctx.module_path {
        Some(path) => content.replace("__MODULE_PATH__", path),
        None => content,
    }
    .trim()
    .to_string()
}
