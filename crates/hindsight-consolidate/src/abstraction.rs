use tracing::{debug, info, warn};

use hindsight_core::model::{
    Fragment, MemoryNode, Methodology, NodeLabel, Relation, RelationKind,
};
use hindsight_core::providers::guarded;

use crate::consolidator::Consolidator;
use crate::error::ConsolidateError;
use crate::report::ConsolidationReport;

impl Consolidator {
    /// Turn groups of successful, not yet abstracted fragments sharing an
    /// error category into methodologies. Fragments whose category already
    /// has a methodology are attached to it instead.
    pub(crate) async fn abstraction_pass(
        &self,
        report: &mut ConsolidationReport,
    ) -> Result<(), ConsolidateError> {
        let candidates = self
            .call(
                "find abstraction candidates",
                self.store.find_nodes(NodeLabel::Fragment, &|n| {
                    n.as_fragment().is_some_and(|f| {
                        f.outcome.is_positive() && !f.abstracted && f.error_category.is_some()
                    })
                }),
            )
            .await?;

        let mut groups: Vec<(String, Vec<Fragment>)> = Vec::new();
        for fragment in candidates.into_iter().filter_map(MemoryNode::into_fragment) {
            let Some(category) = fragment.error_category.clone() else {
                continue;
            };
            match groups.iter_mut().find(|(c, _)| *c == category) {
                Some((_, members)) => members.push(fragment),
                None => groups.push((category, vec![fragment])),
            }
        }

        for (category, members) in groups {
            if let Err(e) = self.abstract_group(&category, members, report).await {
                warn!("Skipping {category} group: {e}");
                report.skipped += 1;
            }
        }
        Ok(())
    }

    async fn abstract_group(
        &self,
        category: &str,
        members: Vec<Fragment>,
        report: &mut ConsolidationReport,
    ) -> Result<(), ConsolidateError> {
        let existing = self
            .call(
                "find methodology",
                self.store.find_nodes(NodeLabel::Methodology, &|n| {
                    n.as_methodology()
                        .is_some_and(|m| m.error_category.as_deref() == Some(category))
                }),
            )
            .await?
            .into_iter()
            .find_map(MemoryNode::into_methodology);

        let methodology = match existing {
            Some(m) => m,
            None if members.len() >= self.config.min_group_size => {
                let m = self.synthesize(category, &members).await;
                self.call("create methodology", self.store.insert_node(m.clone().into()))
                    .await?;
                report.methodologies_created += 1;
                info!("Created methodology {} for {category}", m.id);
                m
            }
            None => {
                debug!(
                    "Leaving {} {category} fragment(s) for a later run",
                    members.len()
                );
                return Ok(());
            }
        };
        self.attach(methodology, category, members, report).await
    }

    /// Build a methodology for `category` from its example fragments.
    async fn synthesize(&self, category: &str, members: &[Fragment]) -> Methodology {
        let situation = format!("when encountering {category}");
        let examples: Vec<String> = members.iter().map(|f| f.actions.join(", ")).collect();

        let generated = match &self.generator {
            Some(generator) => {
                guarded(
                    "generate strategy",
                    self.config.generate_timeout(),
                    generator.summarize(&situation, &examples),
                )
                .await
            }
            None => None,
        };
        let strategy = generated
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.template.render(&situation, &examples));

        let mut methodology =
            Methodology::new(situation, strategy).with_prior(self.config.initial_confidence);
        methodology.error_category = Some(category.to_string());
        methodology.embedding = guarded(
            "embed methodology",
            self.config.embed_timeout(),
            self.embedder
                .embed(&format!("{} {}", methodology.situation, methodology.strategy)),
        )
        .await
        .unwrap_or_default();
        methodology
    }

    /// Record provenance, link fragments and the category's ErrorPattern to
    /// the methodology, then flag the fragments. A fragment whose link or
    /// flag cannot be written is skipped and picked up by a later run.
    async fn attach(
        &self,
        mut methodology: Methodology,
        category: &str,
        members: Vec<Fragment>,
        report: &mut ConsolidationReport,
    ) -> Result<(), ConsolidateError> {
        let added = members
            .iter()
            .filter(|f| methodology.add_source(&f.id))
            .count();
        if added > 0 {
            self.call(
                "update methodology",
                self.store.update_node(methodology.clone().into()),
            )
            .await?;
        }

        if let Some(pattern) = self
            .call("find error pattern", self.store.find_error_pattern(category))
            .await?
        {
            self.call(
                "link resolved_by",
                self.store.merge_relation(Relation::new(
                    pattern.id,
                    methodology.id.clone(),
                    RelationKind::ResolvedBy,
                )),
            )
            .await?;
        }

        for fragment in members {
            let id = fragment.id.clone();
            match self.link_fragment(fragment, &methodology).await {
                Ok(()) => report.fragments_abstracted += 1,
                Err(e) => {
                    warn!("Skipping fragment {id}: {e}");
                    report.skipped += 1;
                }
            }
        }
        Ok(())
    }

    async fn link_fragment(
        &self,
        mut fragment: Fragment,
        methodology: &Methodology,
    ) -> Result<(), ConsolidateError> {
        self.call(
            "link derived_into",
            self.store.merge_relation(Relation::new(
                fragment.id.clone(),
                methodology.id.clone(),
                RelationKind::DerivedInto,
            )),
        )
        .await?;
        fragment.abstracted = true;
        self.call("flag fragment", self.store.update_node(fragment.into()))
            .await?;
        Ok(())
    }
}
