use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{Queue, RoutingBatch, SeverityBatch, SeverityLevel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    pub minor: usize,
    pub moderate: usize,
    pub major: usize,
}

impl SeverityBreakdown {
    pub fn count(&self, level: SeverityLevel) -> usize {
        match level {
            SeverityLevel::Minor => self.minor,
            SeverityLevel::Moderate => self.moderate,
            SeverityLevel::Major => self.major,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueBreakdown {
    pub glass: usize,
    pub fast_track: usize,
    pub material_damage: usize,
    pub total_loss: usize,
}

impl QueueBreakdown {
    pub fn count(&self, queue: Queue) -> usize {
        match queue {
            Queue::Glass => self.glass,
            Queue::FastTrack => self.fast_track,
            Queue::MaterialDamage => self.material_damage,
            Queue::TotalLoss => self.total_loss,
        }
    }
}

impl SeverityBatch {
    /// Unrecognised severity labels are not counted.
    pub fn severity_breakdown(&self) -> SeverityBreakdown {
        let mut breakdown = SeverityBreakdown::default();
        for assessment in &self.assessments {
            match SeverityLevel::parse(&assessment.severity) {
                Some(SeverityLevel::Minor) => breakdown.minor += 1,
                Some(SeverityLevel::Moderate) => breakdown.moderate += 1,
                Some(SeverityLevel::Major) => breakdown.major += 1,
                None => {}
            }
        }
        breakdown
    }
}

impl RoutingBatch {
    /// Unrecognised queue names are not counted.
    pub fn queue_breakdown(&self) -> QueueBreakdown {
        let mut breakdown = QueueBreakdown::default();
        for routing in &self.routings {
            match Queue::parse(&routing.queue) {
                Some(Queue::Glass) => breakdown.glass += 1,
                Some(Queue::FastTrack) => breakdown.fast_track += 1,
                Some(Queue::MaterialDamage) => breakdown.material_damage += 1,
                Some(Queue::TotalLoss) => breakdown.total_loss += 1,
                None => {}
            }
        }
        breakdown
    }

    /// Counts per priority, with every level from 1 to 5 present.
    pub fn priority_breakdown(&self) -> BTreeMap<u8, usize> {
        let mut breakdown: BTreeMap<u8, usize> = (1..=5).map(|p| (p, 0)).collect();
        for routing in &self.routings {
            if let Some(count) = breakdown.get_mut(&routing.priority) {
                *count += 1;
            }
        }
        breakdown
    }
}
