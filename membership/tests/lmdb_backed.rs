//! The reconciler running against the LMDB backend, including concurrent
//! writers from several threads.

use std::sync::Arc;

use circles_membership::{audit, Reconciler};
use circles_store::MembershipStore;
use circles_store_lmdb::environment::MAX_DBS;
use circles_store_lmdb::LmdbEnvironment;
use circles_types::{AccountType, Group, GroupId, User, UserId};

fn temp_reconciler() -> (tempfile::TempDir, LmdbEnvironment, Reconciler) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(dir.path(), MAX_DBS, 32 * 1024 * 1024).expect("open env");
    let store = env.membership_store();
    let users: Vec<User> = (0..6)
        .map(|i| {
            User::new(
                UserId::new(format!("u-{i}")),
                format!("User {i}"),
                format!("user{i}"),
                AccountType::Member,
            )
        })
        .collect();
    let groups = vec![
        Group::new(GroupId::new("g-0"), "Zero"),
        Group::new(GroupId::new("g-1"), "One"),
    ];
    store.import(&users, &groups).expect("seed");
    let reconciler = Reconciler::new(Arc::new(store));
    (dir, env, reconciler)
}

#[test]
fn toggle_persists_both_records() {
    let (_dir, env, rec) = temp_reconciler();
    let (u, g) = (UserId::new("u-0"), GroupId::new("g-0"));
    assert!(rec.toggle_follow(&u, &g).unwrap());

    let store = env.membership_store();
    assert!(store.get_user(&u).unwrap().unwrap().follows(&g));
    let group = store.get_group(&g).unwrap().unwrap();
    assert!(group.has_member(&u) && group.is_followed_by(&u));
}

#[test]
fn concurrent_mixed_writers_leave_no_drift() {
    let (_dir, env, rec) = temp_reconciler();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let rec = rec.clone();
            std::thread::spawn(move || {
                let u = UserId::new(format!("u-{i}"));
                for round in 0..20 {
                    let g = GroupId::new(format!("g-{}", round % 2));
                    match round % 3 {
                        0 => {
                            rec.toggle_follow(&u, &g).unwrap();
                        }
                        1 => {
                            rec.unfollow(&u, &g).unwrap();
                        }
                        _ => {
                            rec.reconcile_follow_status(&u).unwrap();
                        }
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(audit(&env.membership_store()).unwrap().is_empty());
}
