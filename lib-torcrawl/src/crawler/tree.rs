use async_trait::async_trait;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

use super::sink::{Record, Sink};

/// One page of the reachability tree, serialized as
/// `{ "url", "status_code", "status", "children" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub url: String,
    pub status_code: u16,
    pub status: String,
    pub children: Vec<Node>,
}

#[derive(Debug, Default)]
struct NodeData {
    url: String,
    status_code: u16,
    status: String,
    children: Vec<usize>,
}

/// The sink for tree mode: an arena of nodes addressed by stable indices,
/// with one entry per crawled URL.
///
/// Because URL dedup is global, a page reachable over two paths hangs under
/// whichever parent enqueued it first; the tree stays acyclic.
#[derive(Debug, Default)]
pub struct LinkTree {
    inner: Mutex<Arena>,
}

#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<NodeData>,
    index: HashMap<String, usize>,
}

impl LinkTree {
    pub fn new() -> LinkTree {
        LinkTree::default()
    }

    fn insert(&self, record: &Record) {
        let mut arena = self.inner.lock().expect("link tree poisoned");

        let key = record.url.to_string();
        if arena.index.contains_key(&key) {
            // One record per URL is the contract; a second one is dropped.
            return;
        }

        let node_id = arena.nodes.len();
        arena.nodes.push(NodeData {
            url: key.clone(),
            status_code: record.status_code,
            status: record.status.clone(),
            children: Vec::new(),
        });
        arena.index.insert(key.clone(), node_id);

        if let Some(parent) = &record.parent {
            let parent_key = parent.to_string();
            // A page does not get to be its own child.
            if parent_key != key {
                if let Some(&parent_id) = arena.index.get(&parent_key) {
                    arena.nodes[parent_id].children.push(node_id);
                }
            }
        }
    }

    /// Materializes the subtree rooted at `root` as an owned `Node` graph,
    /// or `None` if the URL was never crawled.
    pub fn to_node(&self, root: &Url) -> Option<Node> {
        let arena = self.inner.lock().expect("link tree poisoned");
        let &root_id = arena.index.get(&root.to_string())?;
        Some(build(&arena, root_id))
    }
}

fn build(arena: &Arena, node_id: usize) -> Node {
    let data = &arena.nodes[node_id];
    Node {
        url: data.url.clone(),
        status_code: data.status_code,
        status: data.status.clone(),
        children: data
            .children
            .iter()
            .map(|&child_id| build(arena, child_id))
            .collect(),
    }
}

#[async_trait]
impl Sink for LinkTree {
    async fn publish(&self, record: Record) -> Result<(), anyhow::Error> {
        self.insert(&record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::frontier::Task;
    use http::StatusCode;

    fn record(url: &str, parent: Option<&str>, depth: u16) -> Record {
        let task = Task {
            url: Url::parse(url).unwrap(),
            depth,
            parent: parent.map(|parent| Url::parse(parent).unwrap()),
        };
        Record::response(&task, StatusCode::OK, 0)
    }

    #[tokio::test]
    async fn links_children_to_parents() {
        let tree = LinkTree::new();
        tree.publish(record("https://www.root.com/", None, 0))
            .await
            .unwrap();
        tree.publish(record(
            "https://www.child.com/",
            Some("https://www.root.com/"),
            1,
        ))
        .await
        .unwrap();
        tree.publish(record(
            "https://www.subchild.com/",
            Some("https://www.child.com/"),
            2,
        ))
        .await
        .unwrap();

        let root = tree
            .to_node(&Url::parse("https://www.root.com/").unwrap())
            .unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].url, "https://www.child.com/");
        assert_eq!(root.children[0].children.len(), 1);
        assert_eq!(root.children[0].children[0].url, "https://www.subchild.com/");
        assert_eq!(root.status_code, 200);
        assert_eq!(root.status, "OK");
    }

    #[tokio::test]
    async fn refuses_self_parenting() {
        let tree = LinkTree::new();
        tree.publish(record(
            "https://www.loop.com/",
            Some("https://www.loop.com/"),
            0,
        ))
        .await
        .unwrap();

        let node = tree
            .to_node(&Url::parse("https://www.loop.com/").unwrap())
            .unwrap();
        assert!(node.children.is_empty());
    }

    #[tokio::test]
    async fn unknown_root_is_none() {
        let tree = LinkTree::new();
        assert!(tree
            .to_node(&Url::parse("https://nowhere.example/").unwrap())
            .is_none());
    }

    #[tokio::test]
    async fn json_round_trips() {
        let tree = LinkTree::new();
        tree.publish(record("https://www.root.com/", None, 0))
            .await
            .unwrap();
        tree.publish(record(
            "https://www.child.com/",
            Some("https://www.root.com/"),
            1,
        ))
        .await
        .unwrap();

        let node = tree
            .to_node(&Url::parse("https://www.root.com/").unwrap())
            .unwrap();
        let encoded = serde_json::to_string(&node).unwrap();
        assert!(encoded.contains("\"status_code\":200"));

        let decoded: Node = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, node);
    }
}
