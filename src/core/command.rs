//! Command tokens.
//!
//! A token selects one task and the servers it runs on:
//!
//! - `group:task` runs on every server of the group
//! - `group:<index>:task` runs on the server at that 0-based position
//! - `group:<address>:task` runs on the first server with that address
//!
//! Groups and tasks are scanned in declaration order and the first match
//! wins, so a later group or task reusing a name is unreachable.

use crate::config::ServerConfiguration;
use crate::error::{Error, Result};
use crate::server::Server;
use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub group: &'a ServerConfiguration,
    pub task: &'a Task,
    pub servers: Vec<Server>,
}

pub fn resolve<'a>(token: &str, groups: &'a [ServerConfiguration]) -> Result<Resolved<'a>> {
    for group in groups {
        for task in &group.tasks {
            if format!("{}:{}", group.name, task.name) == token {
                return Ok(Resolved {
                    group,
                    task,
                    servers: group.servers.clone(),
                });
            }

            let selected = group.servers.iter().enumerate().find(|(index, server)| {
                token == format!("{}:{}:{}", group.name, index, task.name)
                    || token == format!("{}:{}:{}", group.name, server.address, task.name)
            });

            if let Some((_, server)) = selected {
                return Ok(Resolved {
                    group,
                    task,
                    servers: vec![server.clone()],
                });
            }
        }
    }

    Err(Error::command_not_found(token))
}

/// Every token `resolve` accepts, one per line of shell completion output.
pub fn completion_tokens(groups: &[ServerConfiguration]) -> Vec<String> {
    let mut tokens = Vec::new();
    for group in groups {
        for task in &group.tasks {
            tokens.push(format!("{}:{}", group.name, task.name));
            for index in 0..group.servers.len() {
                tokens.push(format!("{}:{}:{}", group.name, index, task.name));
            }
            for server in &group.servers {
                tokens.push(format!("{}:{}:{}", group.name, server.address, task.name));
            }
        }
    }
    tokens
}

/// Human-readable listing of groups, their servers and task tokens.
pub fn usage(program: &str, groups: &[ServerConfiguration]) -> String {
    let mut text = format!("Usage: {} <command>\n\nCommands:\n", program);
    for group in groups {
        let addresses: Vec<String> = group
            .servers
            .iter()
            .enumerate()
            .map(|(index, server)| format!("{}: {}", index, server.address))
            .collect();
        text.push_str(&format!("{}: {{{}}}\n", group.name, addresses.join(", ")));

        for task in &group.tasks {
            text.push_str(&format!("  {}:[index|address:]{}\n", group.name, task.name));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn group(name: &str, tasks: &[&str], addresses: &[&str]) -> ServerConfiguration {
        ServerConfiguration {
            name: name.to_string(),
            tasks: tasks
                .iter()
                .map(|t| Task::new(*t, format!("{}.sh", t)))
                .collect(),
            servers: addresses
                .iter()
                .enumerate()
                .map(|(i, a)| Server::new(format!("user{}", i), *a))
                .collect(),
        }
    }

    fn fixture() -> Vec<ServerConfiguration> {
        vec![
            group("web", &["deploy", "restart"], &["10.0.0.1", "10.0.0.2", "10.0.0.1"]),
            group("db", &["backup"], &["10.0.1.1"]),
        ]
    }

    #[test]
    fn whole_group_token_selects_all_servers_in_order() {
        let groups = fixture();
        let resolved = resolve("web:restart", &groups).unwrap();
        assert_eq!(resolved.task.name, "restart");
        assert_eq!(resolved.servers, groups[0].servers);
    }

    #[test]
    fn index_token_selects_one_server() {
        let groups = fixture();
        let resolved = resolve("web:1:deploy", &groups).unwrap();
        assert_eq!(resolved.servers, vec![groups[0].servers[1].clone()]);
    }

    #[test]
    fn out_of_range_index_is_not_found() {
        let groups = fixture();
        let err = resolve("web:3:deploy", &groups).unwrap_err();
        assert_eq!(err.code, ErrorCode::CommandNotFound);
        assert_eq!(err.details["command"], "web:3:deploy");
    }

    #[test]
    fn index_must_match_literally() {
        let groups = fixture();
        assert!(resolve("web:01:deploy", &groups).is_err());
    }

    #[test]
    fn duplicate_address_selects_first_server() {
        let groups = fixture();
        let resolved = resolve("web:10.0.0.1:deploy", &groups).unwrap();
        assert_eq!(resolved.servers.len(), 1);
        assert_eq!(resolved.servers[0].user, "user0");
    }

    #[test]
    fn first_group_with_matching_name_wins() {
        let mut groups = fixture();
        groups.push(group("web", &["deploy"], &["192.168.0.9"]));

        let resolved = resolve("web:deploy", &groups).unwrap();
        assert!(std::ptr::eq(resolved.group, &groups[0]));
        assert_eq!(resolved.servers.len(), 3);
    }

    #[test]
    fn first_task_with_matching_name_wins() {
        let mut groups = vec![group("web", &["deploy", "deploy"], &["10.0.0.1"])];
        groups[0].tasks[1].script = "other.sh".to_string();

        let resolved = resolve("web:deploy", &groups).unwrap();
        assert_eq!(resolved.task.script, "deploy.sh");
    }

    #[test]
    fn group_without_servers_resolves_to_no_targets() {
        let groups = vec![group("idle", &["noop"], &[])];
        let resolved = resolve("idle:noop", &groups).unwrap();
        assert!(resolved.servers.is_empty());
    }

    #[test]
    fn unknown_and_partial_tokens_are_not_found() {
        let groups = fixture();
        for token in ["", "web", "web:", "web:missing", "db:deploy", "web:deploy:extra"] {
            let err = resolve(token, &groups).unwrap_err();
            assert_eq!(err.code, ErrorCode::CommandNotFound, "token {:?}", token);
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let groups = fixture();
        let first = resolve("web:2:restart", &groups).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve("web:2:restart", &groups).unwrap(), first);
        }
    }

    #[test]
    fn every_completion_token_resolves() {
        let groups = fixture();
        let tokens = completion_tokens(&groups);
        assert_eq!(
            &tokens[..7],
            &[
                "web:deploy",
                "web:0:deploy",
                "web:1:deploy",
                "web:2:deploy",
                "web:10.0.0.1:deploy",
                "web:10.0.0.2:deploy",
                "web:10.0.0.1:deploy",
            ]
        );
        for token in &tokens {
            assert!(resolve(token, &groups).is_ok(), "{} should resolve", token);
        }
    }

    #[test]
    fn usage_lists_groups_servers_and_tasks() {
        let text = usage("garrison", &fixture());
        assert_eq!(
            text,
            "Usage: garrison <command>\n\nCommands:\n\
             web: {0: 10.0.0.1, 1: 10.0.0.2, 2: 10.0.0.1}\n\
             \x20 web:[index|address:]deploy\n\
             \x20 web:[index|address:]restart\n\
             db: {0: 10.0.1.1}\n\
             \x20 db:[index|address:]backup\n"
        );
    }
}
