use crate::CaseCommands;

/// Printed by `flapnote case template`.
pub const CASE_TEMPLATE: &str = r#"# flapnote case file
#
# Only [surgeons].flap is required. Anything left out shows up as *** in the
# generated notes.

[patient]
name = ""
mrn = ""
# YYYY-MM-DD, or free text.
date = ""
diagnosis = ""
planned_procedures = []

[surgeons]
# ALT, Fibula, RFFF, Scapula, Jejunal, LatissimusDorsi or Other.
flap = "ALT"
ablative = ""
# The attending profile is picked from this name (e.g. "Dr. Eid").
reconstructive = ""

[modifiers]
oralCavityAerodigestive = false
laryngectomy = false
priorRadiation = false
diabetes = false
tracheostomy = false
traumaRecon = false
gTube = false

[intraop]
anticipated_airway = ""
ett_position = ""
protected_limbs = ""
paralytic_ok = ""
pressors_ok = ""
preop_antibiotics = ""
expected_blood_loss = ""
patient_position = ""
table_position = ""
number_of_setups = ""
saw = ""
drill = ""
hn_plating = ""
extremity_plating = ""
plating_company = ""
# "Yes" adds donor site care to discharge planning.
stsg = ""
anticipated_trach_size = ""
wound_vac = ""

[discharge]
ablative_follow_up = ""
reconstructive_follow_up = ""
home_care = ""
dressing_changes = ""
physical_therapy = ""
dietary_restrictions = ""
medication_instructions = ""
"#;

/// Dispatch a `flapnote case` subcommand.
pub fn run_case_command(command: CaseCommands) -> anyhow::Result<()> {
    match command {
        CaseCommands::Template => {
            print!("{CASE_TEMPLATE}");
        }
    }
    Ok(())
}
