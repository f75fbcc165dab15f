mod common;

use std::fs;

use common::{seed_server, temp_paths, write_marker};
use tokio::sync::broadcast::error::TryRecvError;
use tomcat_launcher_lib::inventory::{
    AddOutcome, InventoryEvent, InventoryTree, NodeItem, NodeKind, DEPLOYED_APPS_LABEL,
};
use tomcat_launcher_lib::paths::AppPaths;
use tomcat_launcher_lib::ErrorKind;

/// A pid no host process can have.
const DEAD_PID: u32 = i32::MAX as u32;

fn labels(tree: &InventoryTree) -> Vec<(String, String)> {
    tree.nodes()
        .iter()
        .map(|n| (n.key.clone(), n.label.clone()))
        .collect()
}

#[tokio::test]
async fn refresh_reports_stale_marker_and_missing_marker_as_stopped() {
    let (_tmp, paths) = temp_paths();
    seed_server(&paths, "apache-tomcat-9.0.50");
    seed_server(&paths, "apache-tomcat-10.1.0");
    write_marker(&paths, "apache-tomcat-9.0.50", DEAD_PID);
    fs::write(paths.servers_dir().join("stray.txt"), "not a server").unwrap();

    let mut tree = InventoryTree::new(paths);
    let instances = tree.refresh().await.unwrap();

    assert_eq!(instances.len(), 2);
    let nine = instances
        .iter()
        .find(|i| i.name == "apache-tomcat-9.0.50")
        .unwrap();
    let ten = instances
        .iter()
        .find(|i| i.name == "apache-tomcat-10.1.0")
        .unwrap();
    assert_eq!(nine.pid, Some(DEAD_PID));
    assert_eq!(ten.pid, None);
    assert!(!nine.is_running());

    for node in tree.nodes() {
        assert_eq!(node.kind(), NodeKind::RootInstance);
        assert!(node.label.starts_with("🔴 "), "{}", node.label);
    }
    assert_eq!(
        tree.find("apache-tomcat-9.0.50").unwrap().pid(),
        Some(DEAD_PID)
    );
}

#[tokio::test]
async fn refresh_is_idempotent() {
    let (_tmp, paths) = temp_paths();
    seed_server(&paths, "apache-tomcat-8.5.99");
    seed_server(&paths, "apache-tomcat-9.0.50");
    write_marker(&paths, "apache-tomcat-8.5.99", DEAD_PID);

    let mut tree = InventoryTree::new(paths);
    tree.refresh().await.unwrap();
    let first = labels(&tree);
    tree.refresh().await.unwrap();

    assert_eq!(first, labels(&tree));
    assert_eq!(tree.server_names(), vec!["apache-tomcat-8.5.99", "apache-tomcat-9.0.50"]);
}

#[tokio::test]
async fn running_process_shows_running_indicator() {
    let (_tmp, paths) = temp_paths();
    seed_server(&paths, "apache-tomcat-9.0.50");
    write_marker(&paths, "apache-tomcat-9.0.50", std::process::id());

    let mut tree = InventoryTree::new(paths);
    tree.refresh().await.unwrap();

    let node = tree.find("apache-tomcat-9.0.50").unwrap();
    assert_eq!(node.label, "🟢 apache-tomcat-9.0.50");
    assert!(tree.instance("apache-tomcat-9.0.50").unwrap().is_running());
}

#[tokio::test]
async fn missing_installation_root_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let mut tree = InventoryTree::new(AppPaths::new(tmp.path().join("absent")));

    let err = tree.refresh().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn expand_lists_actions_and_deployable_archives() {
    let (_tmp, paths) = temp_paths();
    let root = seed_server(&paths, "srv");
    fs::write(root.join("webapps/shop.war"), "war").unwrap();
    fs::write(root.join("webapps/API.WAR"), "war").unwrap();
    fs::write(root.join("webapps/notes.txt"), "txt").unwrap();
    fs::create_dir_all(root.join("webapps/ROOT")).unwrap();

    let mut tree = InventoryTree::new(paths);
    tree.refresh().await.unwrap();
    let children = tree.expand("srv").await.unwrap();

    assert_eq!(children.len(), 5);
    assert!(children[..4].iter().all(|c| c.kind() == NodeKind::ActionItem));
    assert!(children[..4].iter().all(|c| c.command().is_some()));

    let group = &children[4];
    assert_eq!(group.label, DEPLOYED_APPS_LABEL);
    let apps: Vec<&str> = group.children().iter().map(|a| a.label.as_str()).collect();
    assert_eq!(apps, vec!["API.WAR", "shop.war"]);

    let NodeItem::Server(server) = &tree.find("srv").unwrap().item else {
        unreachable!("root is not a server node");
    };
    assert!(server.expanded);
}

#[tokio::test]
async fn expansion_is_cached_until_refresh() {
    let (_tmp, paths) = temp_paths();
    let root = seed_server(&paths, "srv");

    let mut tree = InventoryTree::new(paths);
    tree.refresh().await.unwrap();
    tree.expand("srv").await.unwrap();

    fs::write(root.join("webapps/late.war"), "war").unwrap();
    let cached = tree.expand("srv/webapps").await.unwrap();
    assert!(cached.is_empty());

    tree.refresh().await.unwrap();
    let fresh = tree.expand("srv").await.unwrap();
    assert_eq!(fresh[4].children().len(), 1);
}

#[tokio::test]
async fn leaves_expand_to_nothing_and_unknown_keys_fail() {
    let (_tmp, paths) = temp_paths();
    let root = seed_server(&paths, "srv");
    fs::write(root.join("webapps/a.war"), "war").unwrap();

    let mut tree = InventoryTree::new(paths);
    tree.refresh().await.unwrap();
    tree.expand("srv").await.unwrap();

    assert!(tree.expand("srv/log").await.unwrap().is_empty());
    assert!(tree.expand("srv/webapps/a.war").await.unwrap().is_empty());
    let err = tree.expand("srv/nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn adding_the_same_app_twice_reports_duplicate() {
    let (_tmp, paths) = temp_paths();
    seed_server(&paths, "srvA");

    let mut tree = InventoryTree::new(paths);
    tree.refresh().await.unwrap();
    let mut events = tree.subscribe();

    assert_eq!(
        tree.add_deployed_app("x.war", "srvA").await.unwrap(),
        AddOutcome::Added
    );
    assert_eq!(
        tree.add_deployed_app("x.war", "srvA").await.unwrap(),
        AddOutcome::Duplicate
    );

    let group = tree.find("srvA/webapps").unwrap();
    let named_x = group.children().iter().filter(|c| c.label == "x.war").count();
    assert_eq!(named_x, 1);

    assert_eq!(
        events.try_recv().unwrap(),
        InventoryEvent::DeployedAppAdded {
            instance: "srvA".to_string(),
            app: "x.war".to_string(),
        }
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn only_web_archives_can_be_listed() {
    let (_tmp, paths) = temp_paths();
    seed_server(&paths, "srvA");
    let mut tree = InventoryTree::new(paths);
    tree.refresh().await.unwrap();
    let mut events = tree.subscribe();

    for name in ["notes.txt", "ROOT", "shop.war.bak"] {
        let err = tree.add_deployed_app(name, "srvA").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse, "{}", name);
    }

    assert!(tree.find("srvA/webapps/notes.txt").is_none());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn adding_to_unknown_server_fails() {
    let (_tmp, paths) = temp_paths();
    let mut tree = InventoryTree::new(paths);
    tree.refresh().await.unwrap();

    let err = tree.add_deployed_app("x.war", "ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn removing_an_app_deletes_it_and_rebuilds_the_tree() {
    let (_tmp, paths) = temp_paths();
    let root = seed_server(&paths, "srv");
    fs::write(root.join("webapps/gone.war"), "war").unwrap();
    fs::write(root.join("webapps/kept.war"), "war").unwrap();

    let mut tree = InventoryTree::new(paths);
    tree.refresh().await.unwrap();
    tree.expand("srv").await.unwrap();

    tree.remove_deployed_app("srv/webapps/gone.war").await.unwrap();

    assert!(!root.join("webapps/gone.war").exists());
    assert!(tree.find("srv/webapps").is_none());
    let children = tree.expand("srv").await.unwrap();
    let apps: Vec<&str> = children[4].children().iter().map(|a| a.label.as_str()).collect();
    assert_eq!(apps, vec!["kept.war"]);
}

#[tokio::test]
async fn only_deployed_app_nodes_can_be_removed() {
    let (_tmp, paths) = temp_paths();
    let root = seed_server(&paths, "srv");
    fs::write(root.join("conf/server.xml"), "<Server/>").unwrap();

    let mut tree = InventoryTree::new(paths);
    tree.refresh().await.unwrap();
    tree.expand("srv").await.unwrap();

    let err = tree.remove_deployed_app("srv/server-xml").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(root.join("conf/server.xml").exists());
}
