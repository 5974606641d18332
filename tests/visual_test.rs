mod common;

use common::ScriptedLlm;
use taskforge::tree::{Task, TaskStatus, TaskTree};
use taskforge::visual::summary::{generate_summaries, SUMMARY_FAILED};
use taskforge::visual::{layout, Color, SceneEdge, SummaryCache};

fn sample_tree() -> TaskTree {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let a = tree.add_child(root, Task::new("not started yet")).unwrap();
    tree.add_child(root, Task::new("being worked on").with_code("print(1)")).unwrap();
    let mut done = Task::new("finished work");
    done.status = TaskStatus::Complete;
    tree.add_child(a, done).unwrap();
    tree
}

#[test]
fn test_colors_follow_status() {
    let tree = sample_tree();
    let scene = layout(&tree, &SummaryCache::default(), 50);
    let colors: Vec<_> = tree.walk().iter().map(|v| scene.node(v.id).unwrap().color).collect();
    assert_eq!(colors, vec![Color::Blue, Color::Red, Color::Green, Color::Blue]);
}

#[test]
fn test_positions_and_edges() {
    let tree = sample_tree();
    let root = tree.root();
    let a = tree.children(root)[0];
    let b = tree.children(root)[1];
    let a1 = tree.children(a)[0];
    let scene = layout(&tree, &SummaryCache::default(), 50);

    let pos = |id| {
        let node = scene.node(id).unwrap();
        (node.x, node.y)
    };
    assert_eq!(pos(root), (0.0, 0.0));
    assert_eq!(pos(a), (150.0, 0.0));
    assert_eq!(pos(b), (150.0, 100.0));
    assert_eq!(pos(a1), (300.0, 0.0));

    assert_eq!(scene.edges.len(), 3);
    assert!(scene.edges.contains(&SceneEdge { from: (120.0, 40.0), to: (150.0, 140.0) }));
    assert!(scene.edges.contains(&SceneEdge { from: (270.0, 40.0), to: (300.0, 40.0) }));
}

#[test]
fn test_labels_fall_back_to_truncated_prompt() {
    let mut tree = TaskTree::default();
    let id = tree.add_child(tree.root(), Task::new("a".repeat(80))).unwrap();
    let mut cache = SummaryCache::default();

    let scene = layout(&tree, &cache, 50);
    assert_eq!(scene.node(id).unwrap().label, "a".repeat(50));

    let request = cache.stale(&tree).into_iter().find(|r| r.id == id).unwrap();
    cache.insert(id, request.fingerprint, "Prints the letter a many times.".to_string());
    let scene = layout(&tree, &cache, 10);
    assert_eq!(scene.node(id).unwrap().label, "Prints the");
}

#[test]
fn test_svg_contains_nodes() {
    let tree = sample_tree();
    let svg = layout(&tree, &SummaryCache::default(), 50).to_svg();
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("<ellipse").count(), 4);
    assert_eq!(svg.matches("<line").count(), 3);
    assert!(svg.contains(r#"fill="green""#));
    assert!(svg.contains(r#"fill="red""#));
}

#[test]
fn test_cache_only_reports_changed_nodes() {
    let mut tree = sample_tree();
    let mut cache = SummaryCache::default();
    let requests = cache.stale(&tree);
    assert_eq!(requests.len(), 4);
    for request in requests {
        cache.insert(request.id, request.fingerprint, "summary".to_string());
    }
    assert!(cache.stale(&tree).is_empty());

    let b = tree.children(tree.root())[1];
    tree.get_mut(b).unwrap().code = Some("print(2)".to_string());
    let requests = cache.stale(&tree);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id, b);

    // status changes alone keep the summary
    tree.get_mut(b).unwrap().status = TaskStatus::Complete;
    assert_eq!(cache.stale(&tree).len(), 1);
}

#[test]
fn test_cache_drops_unreachable_nodes() {
    let mut tree = sample_tree();
    let mut cache = SummaryCache::default();
    for request in cache.stale(&tree) {
        cache.insert(request.id, request.fingerprint, "summary".to_string());
    }
    let a = tree.children(tree.root())[0];
    let a1 = tree.children(a)[0];
    let a1_task = tree.get(a1).unwrap().clone();
    tree.remove(a).unwrap();
    cache.retain_reachable(&tree);
    assert!(cache.get(a1, &a1_task).is_none());
}

#[tokio::test]
async fn test_failed_summaries_are_retried() {
    let llm = ScriptedLlm::new(|prompt| {
        if prompt.contains("broken") {
            anyhow::bail!("quota exceeded")
        }
        Ok("  A short summary.  ".to_string())
    });
    let mut tree = TaskTree::default();
    let broken = tree.add_child(tree.root(), Task::new("broken task")).unwrap();
    let mut cache = SummaryCache::default();

    let requests = cache.stale(&tree);
    let results = generate_summaries(&llm, requests).await;
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
    assert_eq!(llm.calls().len(), 2);

    let labels = cache.absorb(results);
    let scene = layout(&tree, &labels, 50);
    assert_eq!(scene.node(tree.root()).unwrap().label, "A short summary.");
    assert_eq!(scene.node(broken).unwrap().label, SUMMARY_FAILED);

    // only the failed node is asked for again
    let retry = cache.stale(&tree);
    assert_eq!(retry.len(), 1);
    assert_eq!(retry[0].id, broken);
    assert_eq!(layout(&tree, &cache, 50).node(broken).unwrap().label, "broken task");
}
