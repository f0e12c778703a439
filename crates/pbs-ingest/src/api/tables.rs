//! Tables published by the PBS data API
//!
//! Listed roughly as the API documents them, not in load order; the loader
//! derives the order from the foreign keys. Every scoped table is filtered to
//! one schedule, and nearly every key includes `schedule_code` for that reason.
//!
//! Where the data dictionary's primary key does not hold in the published
//! data, the table declares none.

use crate::schema::{ForeignKeyDeclaration as Fk, TableDeclaration as Table};

/// Endpoint of the schedule list
pub const SCHEDULES_ENDPOINT: &str = "schedules";

const SCHEDULE: Fk = Fk::new(&["schedule_code"], SCHEDULES_ENDPOINT);

/// The root table; every schedule, not just the current one
pub const SCHEDULES: Table = Table::new(SCHEDULES_ENDPOINT, Some(&["schedule_code"]), &[]).unscoped();

pub static API_TABLES: &[Table] = &[
    SCHEDULES,
    Table::new("programs", Some(&["program_code", "schedule_code"]), &[SCHEDULE]),
    Table::new("organisations", Some(&["organisation_id", "schedule_code"]), &[SCHEDULE]),
    Table::new(
        "items",
        Some(&["li_item_id", "schedule_code"]),
        &[
            SCHEDULE,
            Fk::new(&["program_code", "schedule_code"], "programs"),
            Fk::new(&["organisation_id", "schedule_code"], "organisations"),
        ],
    ),
    Table::new(
        "amt-items",
        Some(&["pbs_concept_id", "li_item_id", "schedule_code"]),
        &[SCHEDULE, Fk::new(&["li_item_id", "schedule_code"], "items")],
    ),
    Table::new("atc-codes", Some(&["atc_code", "schedule_code"]), &[SCHEDULE]),
    Table::new("containers", Some(&["container_code", "schedule_code"]), &[SCHEDULE]),
    Table::new(
        "container-organisation-relationships",
        None,
        &[
            SCHEDULE,
            Fk::new(&["container_code", "schedule_code"], "containers"),
            Fk::new(&["organisation_id", "schedule_code"], "organisations"),
        ],
    ),
    Table::new("copayments", None, &[SCHEDULE]),
    Table::new(
        "criteria",
        Some(&["criteria_prescribing_txt_id", "schedule_code"]),
        &[
            SCHEDULE,
            Fk::new(
                &["criteria_prescribing_txt_id", "schedule_code"],
                "criteria-parameter-relationships",
            ),
        ],
    ),
    Table::new(
        "criteria-parameter-relationships",
        Some(&["criteria_prescribing_txt_id", "parameter_prescribing_txt_id", "schedule_code"]),
        &[
            SCHEDULE,
            Fk::new(&["parameter_prescribing_txt_id", "schedule_code"], "parameters"),
        ],
    ),
    Table::new(
        "dispensing-rules",
        Some(&["dispensing_rule_reference", "schedule_code"]),
        &[SCHEDULE],
    ),
    Table::new(
        "extemporaneous-ingredients",
        Some(&["pbs_code", "schedule_code"]),
        &[SCHEDULE, Fk::new(&["pbs_code", "schedule_code"], "items")],
    ),
    Table::new(
        "extemporaneous-preparations",
        Some(&["pbs_code", "schedule_code"]),
        &[SCHEDULE, Fk::new(&["pbs_code", "schedule_code"], "items")],
    ),
    Table::new(
        "extemporaneous-prep-sfp-relationships",
        Some(&["ex_prep_pbs_code", "sfp_pbs_code", "schedule_code"]),
        &[
            SCHEDULE,
            Fk::new(&["sfp_pbs_code", "schedule_code"], "standard-formula-preparations")
                .to_columns(&["pbs_code", "schedule_code"]),
        ],
    ),
    Table::new(
        "extemporaneous-tariffs",
        Some(&["pbs_code", "schedule_code"]),
        &[SCHEDULE, Fk::new(&["pbs_code", "schedule_code"], "items")],
    ),
    Table::new(
        "fees",
        Some(&["program_code", "schedule_code"]),
        &[SCHEDULE, Fk::new(&["program_code", "schedule_code"], "programs")],
    ),
    Table::new(
        "indications",
        Some(&["indication_prescribing_txt_id", "schedule_code"]),
        &[
            SCHEDULE,
            Fk::new(&["indication_prescribing_txt_id", "schedule_code"], "prescribing-texts")
                .to_columns(&["prescribing_txt_id", "schedule_code"]),
        ],
    ),
    Table::new(
        "item-atc-relationships",
        Some(&["atc_code", "pbs_code", "schedule_code"]),
        &[
            SCHEDULE,
            Fk::new(&["atc_code", "schedule_code"], "atc-codes"),
            Fk::new(&["pbs_code", "schedule_code"], "items"),
        ],
    ),
    Table::new(
        "item-dispensing-rule-relationships",
        Some(&["li_item_id", "dispensing_rule_reference", "schedule_code"]),
        &[
            SCHEDULE,
            Fk::new(&["li_item_id", "schedule_code"], "items"),
            Fk::new(&["dispensing_rule_reference", "schedule_code"], "dispensing-rules"),
        ],
    ),
    Table::new(
        "item-organisation-relationships",
        Some(&["pbs_code", "schedule_code", "organisation_id"]),
        &[
            SCHEDULE,
            Fk::new(&["organisation_id", "schedule_code"], "organisations"),
            Fk::new(&["pbs_code", "schedule_code", "organisation_id"], "items"),
        ],
    ),
    Table::new(
        "item-prescribing-text-relationships",
        Some(&["pbs_code", "schedule_code", "prescribing_txt_id"]),
        &[
            SCHEDULE,
            Fk::new(&["pbs_code", "schedule_code"], "items"),
            Fk::new(&["prescribing_txt_id", "schedule_code"], "prescribing-texts"),
        ],
    ),
    // Documented key (li_item_id, schedule_code) is not unique since schedule 4429
    Table::new(
        "item-pricing-events",
        None,
        &[SCHEDULE, Fk::new(&["li_item_id", "schedule_code"], "items")],
    ),
    Table::new(
        "item-restriction-relationships",
        Some(&["res_code", "pbs_code", "schedule_code"]),
        &[
            SCHEDULE,
            Fk::new(&["pbs_code", "schedule_code"], "items"),
            Fk::new(&["res_code", "schedule_code"], "restrictions"),
        ],
    ),
    // Documented key (program_code, dispensing_rule_mnem, schedule_code) has duplicates
    Table::new(
        "markup-bands",
        None,
        &[
            SCHEDULE,
            Fk::new(&["program_code", "schedule_code"], "programs"),
            Fk::new(&["dispensing_rule_mnem", "schedule_code"], "dispensing-rules"),
        ],
    ),
    Table::new(
        "parameters",
        Some(&["parameter_prescribing_txt_id", "schedule_code"]),
        &[SCHEDULE],
    ),
    Table::new(
        "prescribers",
        Some(&["pbs_code", "prescriber_code", "schedule_code"]),
        &[SCHEDULE, Fk::new(&["pbs_code", "schedule_code"], "items")],
    ),
    Table::new("prescribing-texts", Some(&["prescribing_txt_id", "schedule_code"]), &[SCHEDULE]),
    Table::new(
        "program-dispensing-rules",
        Some(&["program_code", "dispensing_rule_mnem", "schedule_code"]),
        &[
            SCHEDULE,
            Fk::new(&["program_code", "schedule_code"], "programs"),
            Fk::new(&["dispensing_rule_mnem", "schedule_code"], "dispensing-rules"),
        ],
    ),
    Table::new(
        "restriction-prescribing-text-relationships",
        Some(&["res_code", "prescribing_text_id", "schedule_code"]),
        &[
            SCHEDULE,
            Fk::new(&["res_code", "schedule_code"], "restrictions"),
            Fk::new(&["prescribing_text_id", "schedule_code"], "prescribing-texts")
                .to_columns(&["prescribing_txt_id", "schedule_code"]),
        ],
    ),
    Table::new("restrictions", Some(&["res_code", "schedule_code"]), &[SCHEDULE]),
    Table::new(
        "standard-formula-preparations",
        Some(&["pbs_code", "schedule_code"]),
        &[SCHEDULE, Fk::new(&["pbs_code", "schedule_code"], "items")],
    ),
];
