// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Suppresses repeats of the same consecutive error.
///
/// Native status codes that fail every frame (a lost surface, a removed
/// device) would otherwise flood the log. Only the first occurrence of a run
/// is reported; any different status, including success, ends the run.
#[derive(Debug)]
pub struct ErrorDeduper<T: PartialEq> {
    last: Option<T>,
    suppressed: u64,
}

impl<T: PartialEq> ErrorDeduper<T> {
    /// Creates a deduper with no recorded error.
    pub fn new() -> Self {
        Self {
            last: None,
            suppressed: 0,
        }
    }

    /// Records `error` and returns `true` if it should be reported.
    pub fn observe(&mut self, error: T) -> bool {
        if self.last.as_ref() == Some(&error) {
            self.suppressed += 1;
            return false;
        }
        self.last = Some(error);
        true
    }

    /// Ends the current run of errors.
    pub fn clear(&mut self) {
        self.last = None;
    }

    /// The error of the current run, if any.
    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }

    /// How many repeats have been swallowed so far.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

impl<T: PartialEq> Default for ErrorDeduper<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorDeduper;

    #[test]
    fn test_repeats_are_suppressed() {
        let mut deduper = ErrorDeduper::new();
        assert!(deduper.observe(7));
        assert!(!deduper.observe(7));
        assert!(!deduper.observe(7));
        assert_eq!(deduper.suppressed(), 2);
    }

    #[test]
    fn test_different_error_is_reported() {
        let mut deduper = ErrorDeduper::new();
        assert!(deduper.observe("occluded"));
        assert!(deduper.observe("device removed"));
        assert_eq!(deduper.last(), Some(&"device removed"));
    }

    #[test]
    fn test_clear_restarts_reporting() {
        let mut deduper = ErrorDeduper::new();
        assert!(deduper.observe(1));
        deduper.clear();
        assert!(deduper.observe(1));
    }
}
