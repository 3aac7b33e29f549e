//! Builtin business registry.
//!
//! Root tables: applications, students, invoices, payment_plans, programs.
//! Some concepts appear twice: once directly on their own table and once
//! reached through a relation chain from another root table.

use super::domain_map::FieldDefinition;
use super::types::{FieldType, Operator};

const APPLICATION_STATUSES: &[&str] = &[
    "DRAFT",
    "SUBMITTED",
    "IN_REVIEW",
    "OFFER_SENT",
    "ACCEPTED",
    "REJECTED",
    "WITHDRAWN",
];

const INVOICE_STATUSES: &[&str] = &[
    "DRAFT",
    "SCHEDULED",
    "SENT",
    "PARTIALLY_PAID",
    "PAID",
    "OVERDUE",
    "VOID",
];

const PAYMENT_FREQUENCIES: &[&str] = &["WEEKLY", "FORTNIGHTLY", "MONTHLY", "TERM", "UPFRONT"];

const PROGRAM_LEVELS: &[&str] = &[
    "CERTIFICATE_III",
    "CERTIFICATE_IV",
    "DIPLOMA",
    "ADVANCED_DIPLOMA",
    "GRADUATE_DIPLOMA",
];

const TEXT_EXACT: &[Operator] = &[
    Operator::Eq,
    Operator::Neq,
    Operator::In,
    Operator::NotIn,
    Operator::IsNull,
    Operator::IsNotNull,
];

pub(super) fn fields() -> Vec<FieldDefinition> {
    let mut fields = applications();
    fields.extend(students());
    fields.extend(invoices());
    fields.extend(payment_plans());
    fields.extend(programs());
    fields
}

fn applications() -> Vec<FieldDefinition> {
    let root = "applications";
    vec![
        FieldDefinition::new(
            "application_status_direct",
            "Status",
            FieldType::Enum,
            root,
            "status",
        )
        .options(APPLICATION_STATUSES)
        .not_null(),
        FieldDefinition::new(
            "application_reference",
            "Reference",
            FieldType::Text,
            root,
            "reference",
        )
        .not_null(),
        FieldDefinition::new(
            "application_submitted_at",
            "Submitted",
            FieldType::Date,
            root,
            "submitted_at",
        ),
        FieldDefinition::new(
            "application_requested_start",
            "Requested start",
            FieldType::Date,
            root,
            "requested_start_date",
        ),
        FieldDefinition::new(
            "application_tuition_fee",
            "Tuition fee",
            FieldType::Number,
            root,
            "tuition_fee",
        ),
        FieldDefinition::new(
            "application_is_offshore",
            "Offshore",
            FieldType::Boolean,
            root,
            "is_offshore",
        )
        .not_null(),
        FieldDefinition::new(
            "application_agent_name",
            "Agent",
            FieldType::Text,
            root,
            "agents.name",
        )
        .via(&["agents"]),
        FieldDefinition::new(
            "application_agent_email",
            "Agent email",
            FieldType::Text,
            root,
            "agents.email",
        )
        .via(&["agents"]),
        FieldDefinition::new(
            "application_program_code",
            "Program code",
            FieldType::Text,
            root,
            "programs.code",
        )
        .via(&["programs"])
        .operators(TEXT_EXACT),
        FieldDefinition::new(
            "application_program_name",
            "Program",
            FieldType::Text,
            root,
            "programs.name",
        )
        .via(&["programs"]),
        FieldDefinition::new(
            "application_student_last_name",
            "Student last name",
            FieldType::Text,
            root,
            "students.last_name",
        )
        .via(&["students"]),
        FieldDefinition::new(
            "application_student_email",
            "Student email",
            FieldType::Text,
            root,
            "students.email",
        )
        .via(&["students"]),
    ]
}

fn students() -> Vec<FieldDefinition> {
    let root = "students";
    vec![
        FieldDefinition::new(
            "student_first_name",
            "First name",
            FieldType::Text,
            root,
            "first_name",
        )
        .not_null(),
        FieldDefinition::new(
            "student_last_name",
            "Last name",
            FieldType::Text,
            root,
            "last_name",
        )
        .not_null(),
        FieldDefinition::new("student_email", "Email", FieldType::Text, root, "email"),
        FieldDefinition::new(
            "student_date_of_birth",
            "Date of birth",
            FieldType::Date,
            root,
            "date_of_birth",
        ),
        FieldDefinition::new(
            "student_is_international",
            "International",
            FieldType::Boolean,
            root,
            "is_international",
        ),
        FieldDefinition::new(
            "application_status",
            "Application status",
            FieldType::Enum,
            root,
            "applications.status",
        )
        .via(&["applications"])
        .options(APPLICATION_STATUSES),
        FieldDefinition::new(
            "student_agent_name",
            "Agent",
            FieldType::Text,
            root,
            "applications.agents.name",
        )
        .via(&["applications", "agents"]),
    ]
}

fn invoices() -> Vec<FieldDefinition> {
    let root = "invoices";
    vec![
        FieldDefinition::new(
            "invoice_number",
            "Invoice number",
            FieldType::Text,
            root,
            "invoice_number",
        )
        .not_null(),
        FieldDefinition::new("invoice_status", "Status", FieldType::Enum, root, "status")
            .options(INVOICE_STATUSES)
            .not_null(),
        FieldDefinition::new(
            "invoice_amount_due",
            "Amount due",
            FieldType::Number,
            root,
            "amount_due",
        ),
        FieldDefinition::new(
            "invoice_due_date",
            "Due date",
            FieldType::Date,
            root,
            "due_date",
        ),
        FieldDefinition::new(
            "invoice_student_email",
            "Student email",
            FieldType::Text,
            root,
            "students.email",
        )
        .via(&["students"]),
        FieldDefinition::new(
            "invoice_program_code",
            "Program code",
            FieldType::Text,
            root,
            "payment_plans.programs.code",
        )
        .via(&["payment_plans", "programs"])
        .operators(TEXT_EXACT),
    ]
}

fn payment_plans() -> Vec<FieldDefinition> {
    let root = "payment_plans";
    vec![
        FieldDefinition::new("payment_plan_name", "Plan", FieldType::Text, root, "name"),
        FieldDefinition::new(
            "payment_plan_frequency",
            "Frequency",
            FieldType::Enum,
            root,
            "frequency",
        )
        .options(PAYMENT_FREQUENCIES),
        FieldDefinition::new(
            "payment_plan_total",
            "Total",
            FieldType::Number,
            root,
            "total_amount",
        ),
        FieldDefinition::new(
            "payment_plan_is_active",
            "Active",
            FieldType::Boolean,
            root,
            "is_active",
        )
        .not_null(),
        FieldDefinition::new(
            "payment_plan_student_last_name",
            "Student last name",
            FieldType::Text,
            root,
            "students.last_name",
        )
        .via(&["students"]),
    ]
}

fn programs() -> Vec<FieldDefinition> {
    let root = "programs";
    vec![
        FieldDefinition::new("program_code", "Code", FieldType::Text, root, "code")
            .operators(TEXT_EXACT)
            .not_null(),
        FieldDefinition::new("program_name", "Name", FieldType::Text, root, "name").not_null(),
        FieldDefinition::new("program_level", "Level", FieldType::Enum, root, "level")
            .options(PROGRAM_LEVELS),
        FieldDefinition::new(
            "program_duration_weeks",
            "Duration (weeks)",
            FieldType::Number,
            root,
            "duration_weeks",
        ),
        FieldDefinition::new(
            "program_intake_start",
            "Next intake",
            FieldType::Date,
            root,
            "intake_start_date",
        ),
        FieldDefinition::new(
            "program_is_active",
            "Active",
            FieldType::Boolean,
            root,
            "is_active",
        ),
    ]
}
