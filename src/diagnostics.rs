use std::fmt::Write;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::queue::QueueEntry;
use crate::results::TaskResultsList;
use crate::utils::format_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Failed,
    Skipped,
}

impl Status {
    fn color(self) -> &'static str {
        match self {
            Status::Ok => "#90EE90",
            Status::Failed => "#F08080",
            Status::Skipped => "#D3D3D3",
        }
    }
}

/// Renders the outcome of a pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics;

impl Diagnostics {
    /// Builds the dependency graph of the queue. Edges point from a task to
    /// the queued tasks depending on it, within the same environment.
    fn graph(results: &TaskResultsList) -> DiGraph<&QueueEntry, ()> {
        let entries = results.queue().entries();
        let mut graph = DiGraph::with_capacity(entries.len(), 0);

        let nodes: Vec<NodeIndex> = entries.iter().map(|entry| graph.add_node(entry)).collect();

        for (index, entry) in entries.iter().enumerate() {
            for (earlier, other) in entries[..index].iter().enumerate() {
                let depends = other.env.id == entry.env.id
                    && entry
                        .task
                        .dependencies()
                        .iter()
                        .any(|selector| selector.matches(other.task.id()));

                if depends {
                    graph.add_edge(nodes[earlier], nodes[index], ());
                }
            }
        }

        graph
    }

    /// Renders the queue as a Mermaid diagram.
    ///
    /// * **Green**: Completed
    /// * **Red**: Failed
    /// * **Grey**: Skipped
    pub fn render_mermaid(results: &TaskResultsList) -> String {
        let graph = Self::graph(results);

        let mut f = String::new();
        writeln!(f, "graph LR").unwrap();

        for index in graph.node_indices() {
            let entry = graph[index];
            let task = entry.task.id();
            let name = format!("{} ({})", task, entry.env.id).replace('"', "#quot;");

            // Skipped in this run, even if a chained run left a result behind.
            let (status, extra) = match results.get(task, &entry.env.id) {
                Some(result) if result.is_failed() => {
                    (Status::Failed, format_duration(result.duration()))
                }
                Some(result) => (Status::Ok, format_duration(result.duration())),
                None => (Status::Skipped, "Skipped".to_string()),
            };

            writeln!(f, "    {}[\"{}\\n{}\"]", index.index(), name, extra).unwrap();
            writeln!(f, "    style {} fill:{}", index.index(), status.color()).unwrap();
        }

        for edge in graph.edge_indices() {
            let (source, target) = graph.edge_endpoints(edge).unwrap();
            writeln!(f, "    {} --> {}", source.index(), target.index()).unwrap();
        }

        f
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::SystemTime;

    use super::*;
    use crate::component::ComponentId;
    use crate::env::EnvDefinition;
    use crate::queue::TaskQueue;
    use crate::report::MemoryReporter;
    use crate::results::{ComponentResult, TaskResults};
    use crate::task::{BuildTask, BuiltTaskResult, TaskSelector};

    #[test]
    fn test_render_mermaid() {
        let env = EnvDefinition::new("acme.envs/node");
        let compile = Arc::new(
            BuildTask::define("acme/compiler", "Compile").run(|_| Ok(BuiltTaskResult::default())),
        );
        let test = Arc::new(
            BuildTask::define("acme/tester", "Test")
                .depends_on(TaskSelector::aspect("acme/compiler"))
                .run(|_| Ok(BuiltTaskResult::default())),
        );

        let mut queue = TaskQueue::new();
        queue.push(compile.clone(), env.clone());
        queue.push(test, env.clone());

        let button: ComponentId = "acme/button".parse().unwrap();
        let now = SystemTime::now();
        let failed = TaskResults {
            task: compile,
            env,
            components_results: vec![ComponentResult::new(button).with_error_message("boom")],
            artifacts: None,
            start_time: now,
            end_time: now,
        };

        let results = TaskResultsList::new(
            queue,
            vec![Arc::new(failed)],
            vec![1],
            None,
            Arc::new(MemoryReporter::new()),
        );

        let chart = Diagnostics::render_mermaid(&results);
        assert!(chart.starts_with("graph LR\n"));
        assert!(chart.contains("style 0 fill:#F08080"));
        assert!(chart.contains("1[\"acme/tester:Test (acme.envs/node)\\nSkipped\"]"));
        assert!(chart.contains("style 1 fill:#D3D3D3"));
        assert!(chart.contains("0 --> 1"));
    }
}
