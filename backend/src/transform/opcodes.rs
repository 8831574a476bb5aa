//! Opcode table.
//!
//! One [`OpcodeSpec`] per [`Opcode`] carries everything the pipeline knows
//! about a command kind: its display name, its default template, the fields
//! that must end up non-empty, and its packed columns.
//!
//! Template key order is the order fields are written to the DWS section.

use crate::api::logs::log_warning;
use crate::models::{Opcode, ParameterSet};

/// Static description of one command kind.
#[derive(Debug)]
pub struct OpcodeSpec {
    pub opcode: Opcode,
    /// Value of the `OpcodeStr` field
    pub name: &'static str,
    /// Template fields after `OpcodeStr` and `Opcode`
    pub defaults: &'static [(&'static str, &'static str)],
    /// Fields that must be non-empty for the robot to load the section
    pub required: &'static [&'static str],
    /// Packed column → key prefix
    pub implosion: &'static [(&'static str, &'static str)],
}

const IDENTITY: &[&str] = &["OpcodeStr", "Opcode"];

static OPCODE_TABLE: [OpcodeSpec; 10] = [
    OpcodeSpec {
        opcode: Opcode::SampleTransfer,
        name: "SampleTransfer",
        defaults: &[
            ("Source1", ""),
            ("Source_Pat_Z1", ""),
            ("Source_Pat_S1", ""),
            ("Source_Pat_T1", "1"),
            ("Destination1", ""),
            ("Destination_Pat_Z1", ""),
            ("Destination_Pat_S1", ""),
            ("Destination_Pat_T1", "1"),
            ("TransferVolumenNanoliter", ""),
            ("Filter", "0"),
            ("LiqName", "Water"),
            ("Bezeichner", ""),
            ("ToolName", "TS_50"),
            ("ToolDatei", "./top/dws/tools/TS_50"),
            ("LiqDatei", "./top/dws/liquids/Water"),
            ("TransferVolumenUnit", "0"),
            ("Source_Pat_AnzDup", "1"),
            ("Source_Pat_Anz", "1"),
            ("Source_Pat_Vorhanden", "1"),
            ("Destination_Pat_AnzDup", "1"),
            ("Destination_Pat_Anz", "1"),
            ("Destination_Pat_Vorhanden", "1"),
            ("IrregularPattern", "1"),
            ("IrregularSrcPattern", "1"),
            ("IrregularDesPattern", "1"),
        ],
        required: &[
            "OpcodeStr",
            "Opcode",
            "Source1",
            "Source_Pat_Z1",
            "Source_Pat_S1",
            "Source_Pat_T1",
            "Destination1",
            "Destination_Pat_Z1",
            "Destination_Pat_S1",
            "Destination_Pat_T1",
            "TransferVolumenNanoliter",
            "Filter",
            "LiqName",
            "LiqDatei",
            "ToolName",
            "ToolDatei",
            "Source_Pat_AnzDup",
            "Source_Pat_Vorhanden",
            "Destination_Pat_AnzDup",
            "Destination_Pat_Vorhanden",
        ],
        implosion: &[],
    },
    OpcodeSpec {
        opcode: Opcode::Wait,
        name: "Wait",
        defaults: &[
            ("Bezeichner", ""),
            ("WaitMinute", "0"),
            ("WaitSekunde", "0"),
            ("WaitTemp", "0"),
            ("WaitTempPos", ""),
            ("WaitCycler", "0"),
        ],
        required: IDENTITY,
        implosion: &[],
    },
    OpcodeSpec {
        opcode: Opcode::Comment,
        name: "Comment",
        defaults: &[("Bezeichner", "")],
        required: IDENTITY,
        implosion: &[],
    },
    OpcodeSpec {
        opcode: Opcode::UserIntervention,
        name: "UserIntervention",
        defaults: &[("Bezeichner", ""), ("Alarm", "0")],
        required: IDENTITY,
        implosion: &[],
    },
    OpcodeSpec {
        opcode: Opcode::PlaceIt,
        name: "Place it",
        defaults: &[
            ("Bezeichner", ""),
            ("MatDatei", ""),
            ("MatName", ""),
            ("BehaelterName", ""),
            ("EnumMatType", ""),
            ("EnumSlotNr", ""),
            ("Stapelindex", "0"),
            ("RackLevelSensor", "0"),
            ("RackTemperatur", "0"),
        ],
        required: &[
            "OpcodeStr",
            "Opcode",
            "MatDatei",
            "MatName",
            "BehaelterName",
            "EnumMatType",
            "EnumSlotNr",
        ],
        implosion: &[
            ("ReagenzNamen", "ReagenzName_"),
            ("StartVolumen", "StartVolumenNanoliter_"),
            ("StartVolumenNanoliter", "StartVolumenNanoliter_"),
        ],
    },
    OpcodeSpec {
        opcode: Opcode::PreRun,
        name: "PreRun",
        defaults: &[("Bezeichner", "")],
        required: IDENTITY,
        implosion: &[],
    },
    OpcodeSpec {
        opcode: Opcode::PostRun,
        name: "PostRun",
        defaults: &[("Bezeichner", "")],
        required: IDENTITY,
        implosion: &[],
    },
    OpcodeSpec {
        opcode: Opcode::NumberOfSamples,
        name: "NumberOfSamples",
        defaults: &[
            ("Bezeichner", ""),
            ("Fest", "1"),
            ("festeProbenzahl", "1"),
            ("maxProbenzahl", "0"),
        ],
        required: &["OpcodeStr", "Opcode", "Fest", "festeProbenzahl", "maxProbenzahl"],
        implosion: &[],
    },
    OpcodeSpec {
        opcode: Opcode::Thermomixer,
        name: "Thermomixer",
        defaults: &[
            ("Bezeichner", ""),
            ("WithTemplate", "1"),
            ("TemplateDatei", "top/dws/tmx/"),
            ("TemplateName", "PCR 96"),
            ("EditTempPar", "1"),
            ("SpeedOn", "1"),
            ("MixSpeed", "1500"),
            ("MixTimeMinute", "2"),
            ("MixTimeSecond", "0"),
            ("TempOn", "1"),
            ("Temperature", "25"),
            ("TempHold", "1"),
        ],
        required: IDENTITY,
        implosion: &[],
    },
    OpcodeSpec {
        opcode: Opcode::End,
        name: "End",
        defaults: &[],
        required: IDENTITY,
        implosion: &[],
    },
];

/// Table entry for a known opcode.
pub fn spec(opcode: Opcode) -> &'static OpcodeSpec {
    OPCODE_TABLE
        .iter()
        .find(|s| s.opcode == opcode)
        .unwrap_or(&OPCODE_TABLE[0])
}

/// All table entries, in code order.
pub fn all_specs() -> &'static [OpcodeSpec] {
    &OPCODE_TABLE
}

/// Map a raw code to a known opcode, falling back to [`Opcode::FALLBACK`].
///
/// Returns the opcode and whether the fallback was taken.
pub fn lookup(code: &str) -> (Opcode, bool) {
    match Opcode::from_code(code) {
        Some(op) => (op, false),
        None => (Opcode::FALLBACK, true),
    }
}

/// Find an opcode by its display name, ignoring case and surrounding spaces.
pub fn opcode_by_name(name: &str) -> Option<Opcode> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    OPCODE_TABLE
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .map(|s| s.opcode)
}

impl OpcodeSpec {
    /// Fresh copy of the template, identity fields first.
    pub fn template(&self) -> ParameterSet {
        let mut set = ParameterSet::new();
        set.insert("OpcodeStr", self.name);
        set.insert("Opcode", self.opcode.code());
        for (key, value) in self.defaults {
            set.insert(*key, *value);
        }
        set
    }

    /// Packed column → key prefix, as an owned mapping.
    pub fn implosion_rules(&self) -> ImplosionRules {
        self.implosion.iter().copied().collect()
    }
}

/// Packed column names and the key prefix each expands to.
pub type ImplosionRules = indexmap::IndexMap<&'static str, &'static str>;

/// Default parameter set for a code.
///
/// Unknown codes get the [`Opcode::FALLBACK`] template and a warning, so
/// a typo in the opcode column yields a transfer-shaped section rather
/// than an error.
pub fn defaults_for(code: &str) -> ParameterSet {
    let (opcode, fell_back) = lookup(code);
    if fell_back {
        log_warning(format!(
            "Opcode '{}' not recognized, using {} ({}) defaults",
            code,
            opcode.code(),
            spec(opcode).name
        ));
    }
    spec(opcode).template()
}

/// Packed columns of a code. Empty for every opcode but Place it.
pub fn implosion_rules_for(code: &str) -> ImplosionRules {
    spec(lookup(code).0).implosion_rules()
}

/// Required non-empty fields of a code, or `None` if the code is unknown.
pub fn required_fields_for(code: &str) -> Option<&'static [&'static str]> {
    Opcode::from_code(code).map(|op| spec(op).required)
}
