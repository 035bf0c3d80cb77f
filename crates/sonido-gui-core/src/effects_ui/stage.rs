//! Stage (signal conditioning / stereo utility) effect UI panel.

use crate::widgets::{BypassToggle, bridged_combo, bridged_knob};
use crate::{ParamBridge, ParamIndex, SlotIndex};
use egui::Ui;

/// Channel mode labels for the combo box.
const CHANNEL_MODES: &[&str] = &["Normal", "Swap", "Mono L", "Mono R"];

/// On/off labels reused for toggle-style combos.
const ON_OFF: &[&str] = &["Off", "On"];

/// Haas side labels.
const HAAS_SIDES: &[&str] = &["Left", "Right"];

/// UI panel for the Stage effect.
pub struct StagePanel;

impl StagePanel {
    /// Create a new Stage panel.
    pub fn new() -> Self {
        Self
    }

    /// Render the Stage controls.
    ///
    /// Param indices: 0 = gain, 1 = width, 2 = balance, 3 = phase L,
    /// 4 = phase R, 5 = channel, 6 = DC block, 7 = bass mono,
    /// 8 = bass freq, 9 = haas, 10 = haas side, 11 = output.
    pub fn ui(&mut self, ui: &mut Ui, bridge: &dyn ParamBridge, slot: SlotIndex) {
        ui.vertical(|ui| {
            // -- Header: bypass + channel mode --
            ui.horizontal(|ui| {
                let mut active = !bridge.is_bypassed(slot);
                if ui.add(BypassToggle::new(&mut active, "Active")).changed() {
                    bridge.set_bypassed(slot, !active);
                }

                ui.add_space(20.0);

                ui.label("Chan:");
                bridged_combo(ui, bridge, slot, ParamIndex(5), "chan", CHANNEL_MODES);
            });

            ui.add_space(12.0);

            // -- Row 1: Gain, Width, Balance, Output --
            ui.horizontal(|ui| {
                bridged_knob(ui, bridge, slot, ParamIndex(0), "GAIN");
                ui.add_space(16.0);
                bridged_knob(ui, bridge, slot, ParamIndex(1), "WIDTH");
                ui.add_space(16.0);
                bridged_knob(ui, bridge, slot, ParamIndex(2), "BAL");
                ui.add_space(16.0);
                bridged_knob(ui, bridge, slot, ParamIndex(11), "OUTPUT");
            });

            ui.add_space(8.0);

            // -- Row 2: Phase L, Phase R, DC Block --
            ui.horizontal(|ui| {
                ui.label("Phase L:");
                bridged_combo(ui, bridge, slot, ParamIndex(3), "phl", ON_OFF);
                ui.add_space(12.0);
                ui.label("Phase R:");
                bridged_combo(ui, bridge, slot, ParamIndex(4), "phr", ON_OFF);
                ui.add_space(12.0);
                ui.label("DC Block:");
                bridged_combo(ui, bridge, slot, ParamIndex(6), "dc", ON_OFF);
            });

            ui.add_space(8.0);

            // -- Row 3: Bass Mono, Bass Freq, Haas, Haas Side --
            ui.horizontal(|ui| {
                ui.label("Bass Mono:");
                bridged_combo(ui, bridge, slot, ParamIndex(7), "bmono", ON_OFF);
                ui.add_space(12.0);
                bridged_knob(ui, bridge, slot, ParamIndex(8), "B.FREQ");
            });

            ui.add_space(8.0);

            ui.horizontal(|ui| {
                bridged_knob(ui, bridge, slot, ParamIndex(9), "HAAS");
                ui.add_space(12.0);
                ui.label("Side:");
                bridged_combo(ui, bridge, slot, ParamIndex(10), "hside", HAAS_SIDES);
            });
        });
    }
}

impl Default for StagePanel {
    fn default() -> Self {
        Self::new()
    }
}
