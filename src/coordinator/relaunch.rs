use std::ffi::OsString;

use crate::{
    channel::Channel,
    classify::{Classification, RELAUNCH},
    invocation::{Invocation, InvocationArgs},
    shell::RelaunchRequest,
};

/// Builds the arguments for a profile relaunch.
///
/// A first run starts over with only the profile switch and `--relaunch`.
/// Otherwise the original arguments are kept and both are appended.
pub fn relaunch_args(classification: &Classification, args: &InvocationArgs) -> Vec<OsString> {
    let marker = [
        OsString::from(&classification.user_data_dir_switch),
        OsString::from(RELAUNCH),
    ];

    if classification.first_run {
        marker.to_vec()
    } else {
        args.user_args().iter().cloned().chain(marker).collect()
    }
}

/// Returns the relaunch needed to run with the channel's profile, if any.
///
/// The dev channel and processes that already carry a continuation marker
/// never relaunch. The relaunched process does not inherit
/// `user_data_dir_env`.
pub(super) fn profile_relaunch(
    channel: Channel,
    classification: &Classification,
    invocation: &Invocation,
    user_data_dir_env: &str,
) -> Option<RelaunchRequest> {
    if channel.is_dev() || classification.has_continuation_marker() {
        return None;
    }

    Some(RelaunchRequest {
        args: relaunch_args(classification, &invocation.args),
        env: invocation.env.without(user_data_dir_env),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::{classify, DEVELOPMENT_OVERRIDE, SQUIRREL_FIRSTRUN},
        invocation::Environment,
    };

    fn invocation(args: &[&str]) -> Invocation {
        Invocation::new(
            InvocationArgs::new(std::iter::once("brave.exe").chain(args.iter().copied())),
            Environment::from_iter([("CHROME_USER_DATA_DIR", "/tmp/x"), ("PATH", "/bin")]),
            "/brave/app-1/brave.exe",
        )
    }

    fn relaunch(channel: Channel, args: &[&str]) -> Option<RelaunchRequest> {
        let invocation = invocation(args);
        let classification = classify(channel, &invocation.args, DEVELOPMENT_OVERRIDE);

        profile_relaunch(channel, &classification, &invocation, "CHROME_USER_DATA_DIR")
    }

    #[test]
    fn test_appends_switch_to_existing_args() {
        let request = relaunch(Channel::Beta, &["https://brave.com"]).unwrap();

        assert_eq!(
            request.args,
            vec![
                OsString::from("https://brave.com"),
                OsString::from("--user-data-dir-name=brave-beta"),
                OsString::from("--relaunch"),
            ]
        );
        assert!(!request.env.contains("CHROME_USER_DATA_DIR"));
        assert!(request.env.contains("PATH"));
    }

    #[test]
    fn test_first_run_discards_args() {
        let request = relaunch(Channel::Nightly, &[SQUIRREL_FIRSTRUN, "https://brave.com"]).unwrap();

        assert_eq!(
            request.args,
            vec![
                OsString::from("--user-data-dir-name=brave-nightly"),
                OsString::from("--relaunch"),
            ]
        );
    }

    #[test]
    fn test_dev_never_relaunches() {
        assert_eq!(relaunch(Channel::Dev, &[]), None);
        assert_eq!(relaunch(Channel::Dev, &[SQUIRREL_FIRSTRUN]), None);
        assert_eq!(relaunch(Channel::Dev, &["--user-data-dir-name=brave-beta"]), None);
    }

    #[test]
    fn test_markers_prevent_relaunch() {
        for channel in [Channel::Nightly, Channel::Developer, Channel::Beta, Channel::Release] {
            let switch = channel.user_data_dir_switch();

            assert_eq!(relaunch(channel, &[switch.as_str()]), None);
            assert_eq!(relaunch(channel, &["--relaunch"]), None);
            assert_eq!(relaunch(channel, &[DEVELOPMENT_OVERRIDE]), None);
            assert!(relaunch(channel, &["--user-data-dir-name=brave-other"]).is_some());
        }
    }
}
