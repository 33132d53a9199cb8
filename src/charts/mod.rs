//! The six chart pipelines. Each turns a [`Selection`] into a full [`Scene`]
//! by filtering, aggregating, scaling and encoding its own dataset.

pub mod bubble;
pub mod choropleth;
pub mod connected_scatter;
pub mod dual_axis;
pub mod energy_mix;
pub mod flows_access;

use crate::controller::{Control, Selection};
use crate::data::Field;
use crate::reconcile::Timing;
use crate::scene::{Frame, Margin, Scene};
use anyhow::Result;
use std::fmt;

pub use bubble::Bubble;
pub use choropleth::Choropleth;
pub use connected_scatter::ConnectedScatter;
pub use dual_axis::DualAxis;
pub use energy_mix::EnergyMix;
pub use flows_access::FlowsAccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ChartKind {
    ConnectedScatter,
    Bubble,
    EnergyMix,
    DualAxis,
    FlowsAccess,
    Choropleth,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::ConnectedScatter,
        ChartKind::Bubble,
        ChartKind::EnergyMix,
        ChartKind::DualAxis,
        ChartKind::FlowsAccess,
        ChartKind::Choropleth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChartKind::ConnectedScatter => "connected-scatter",
            ChartKind::Bubble => "bubble",
            ChartKind::EnergyMix => "energy-mix",
            ChartKind::DualAxis => "dual-axis",
            ChartKind::FlowsAccess => "flows-access",
            ChartKind::Choropleth => "choropleth",
        }
    }

    /// Columns the chart needs from the CSV
    pub fn fields(self) -> &'static [Field] {
        match self {
            ChartKind::ConnectedScatter => &[Field::Year, Field::GdpPerCapita, Field::RenewableShare],
            ChartKind::Bubble => &[Field::Year, Field::ElectricityAccess, Field::Co2Emissions],
            ChartKind::EnergyMix => &[
                Field::Year,
                Field::FossilElectricity,
                Field::NuclearElectricity,
                Field::RenewableElectricity,
            ],
            ChartKind::DualAxis => &[Field::Year, Field::EnergyIntensity, Field::GdpGrowth],
            ChartKind::FlowsAccess => &[Field::Year, Field::FinancialFlows, Field::ElectricityAccess],
            ChartKind::Choropleth => &[Field::Year, Field::RenewablesPrimary],
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A chart pipeline bound to its dataset
pub trait Chart {
    fn kind(&self) -> ChartKind;

    /// The controls this chart starts with
    fn control(&self) -> Control;

    /// Transition durations used when reconciling successive scenes
    fn timing(&self) -> Timing {
        Timing::INSTANT
    }

    /// Every element of the chart for `selection`, axes and titles included
    fn render(&self, selection: &Selection) -> Result<Scene>;
}

pub(crate) fn frame(width: f64, height: f64, top: f64, right: f64, bottom: f64, left: f64) -> Frame {
    Frame::new(width, height, Margin { top, right, bottom, left })
}
