//! Group membership export

use super::{Exporter, Identities};
use permaudit_core::{bom_csv_writer, DirectoryFetcher, GroupMember, PermissionFetcher, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Header of the membership file
pub const GROUP_MEMBER_COLUMNS: [&str; 5] =
    ["group_id", "group_name", "user_id", "user_name", "user_email"];

/// One user in one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Membership {
    group_id: String,
    group_name: String,
    member: GroupMember,
}

impl<F> Exporter<'_, F>
where
    F: PermissionFetcher + DirectoryFetcher + ?Sized,
{
    /// Members of every group, groups ordered by name
    pub(super) async fn memberships(
        &self,
        identities: &Identities,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<Membership>> {
        let tasks = identities
            .groups_by_name()
            .into_iter()
            .map(|(group_id, group_name)| async move {
                let label = format!("group {group_name}");
                let outcome = self
                    .timed(&label, self.fetcher.group_members(group_id))
                    .await
                    .map(|members| {
                        members
                            .into_iter()
                            .map(|member| Membership {
                                group_id: group_id.to_string(),
                                group_name: group_name.to_string(),
                                member,
                            })
                            .collect::<Vec<_>>()
                    });
                (label, outcome)
            });
        self.drain(tasks, warnings).await
    }
}

pub(super) fn write_memberships(memberships: &[Membership], path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut writer = bom_csv_writer(BufWriter::new(File::create(path)?))?;
    writer.write_record(GROUP_MEMBER_COLUMNS)?;
    for m in memberships {
        writer.write_record([
            m.group_id.as_str(),
            m.group_name.as_str(),
            m.member.id.as_str(),
            m.member.name.as_str(),
            m.member.email.as_str(),
        ])?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), rows = memberships.len(), "wrote group members");
    Ok(())
}
