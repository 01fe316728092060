use super::models::{JobStatus, ProgressSnapshot};

pub const JOB_CREATED: (u8, &str) = (17, "Job Created");
pub const EXTRACTING: (u8, &str) = (33, "PDF Text Extraction");
pub const PROCESSING: (u8, &str) = (50, "Processing Started");
pub const SUMMARIZING: (u8, &str) = (67, "Processing...");
pub const FINALIZING: (u8, &str) = (83, "Almost Done");
pub const COMPLETE: (u8, &str) = (100, "Complete!");
const IN_PROGRESS: (u8, &str) = (50, "Processing...");

/// Translate a status token into the milestone shown to the user.
///
/// The first poll after submission always reports "Job Created", whatever
/// the token says. Tokens outside the vocabulary (including `queued` and
/// `error`) fall back to the generic in-progress milestone.
pub fn map_status(status: &JobStatus, is_first_poll: bool) -> ProgressSnapshot {
    let (percentage, label) = if is_first_poll {
        JOB_CREATED
    } else {
        match status {
            JobStatus::Extracting => EXTRACTING,
            JobStatus::Processing => PROCESSING,
            JobStatus::Summarizing => SUMMARIZING,
            JobStatus::Finalizing => FINALIZING,
            JobStatus::Completed => COMPLETE,
            _ => IN_PROGRESS,
        }
    };
    ProgressSnapshot::new(percentage, label)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MILESTONES: [u8; 6] = [17, 33, 50, 67, 83, 100];

    fn all_statuses() -> Vec<JobStatus> {
        [
            "queued",
            "extracting",
            "processing",
            "summarizing",
            "finalizing",
            "completed",
            "error",
            "something-new",
        ]
        .iter()
        .map(|token| JobStatus::from_token(token))
        .collect()
    }

    #[test]
    fn table_matches_known_tokens() {
        let cases = [
            ("extracting", 33, "PDF Text Extraction"),
            ("processing", 50, "Processing Started"),
            ("summarizing", 67, "Processing..."),
            ("finalizing", 83, "Almost Done"),
            ("completed", 100, "Complete!"),
            ("queued", 50, "Processing..."),
            ("mystery", 50, "Processing..."),
        ];
        for (token, percentage, label) in cases {
            let snapshot = map_status(&JobStatus::from_token(token), false);
            assert_eq!(snapshot, ProgressSnapshot::new(percentage, label), "token {token}");
        }
    }

    #[test]
    fn first_poll_wins_over_token() {
        for status in all_statuses() {
            assert_eq!(
                map_status(&status, true),
                ProgressSnapshot::new(17, "Job Created"),
                "status {status}"
            );
        }
    }

    #[test]
    fn mapping_is_pure_and_stays_on_milestones() {
        for status in all_statuses() {
            for first in [true, false] {
                let a = map_status(&status, first);
                let b = map_status(&status, first);
                assert_eq!(a, b);
                assert!(MILESTONES.contains(&a.percentage));
            }
        }
    }
}
