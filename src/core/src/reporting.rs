// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;

use internal_error::InternalError;
use serde::Serialize;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Usage of a dataset feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureEvent {
    pub feature: String,
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl FeatureEvent {
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Sink for usage events. Failures to report never affect the operation
/// being reported.
pub trait EventReporter: Send + Sync {
    fn report(&self, event: &FeatureEvent) -> Result<(), InternalError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Default, Clone, Copy)]
pub struct EventReporterNoop;

impl EventReporter for EventReporterNoop {
    fn report(&self, _event: &FeatureEvent) -> Result<(), InternalError> {
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Emits events as structured log records
#[derive(Debug, Default, Clone, Copy)]
pub struct EventReporterTracing;

impl EventReporter for EventReporterTracing {
    fn report(&self, event: &FeatureEvent) -> Result<(), InternalError> {
        tracing::info!(feature = %event.feature, parameters = ?event.parameters, "Feature used");
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub(crate) fn report(reporter: &dyn EventReporter, event: FeatureEvent) {
    if let Err(err) = reporter.report(&event) {
        tracing::warn!(error = ?err, feature = %event.feature, "Failed to report event");
    }
}
