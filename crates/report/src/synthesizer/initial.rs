//! First-report generators, one per report type.

use std::collections::BTreeMap;

use folio_core::{AssetList, Instrument, ReportType, SectionKind, StatePatch};

use super::{Draft, describe, html, market, metric_cell};

impl Draft<'_> {
    pub(super) fn initial_report(
        &mut self,
        report_type: ReportType,
        assets: &AssetList,
        timeframe: &str,
    ) -> StatePatch {
        let instruments = self.instruments(assets);
        let metrics = self.state.metrics.clone();
        self.record_quotes(&instruments, &metrics);

        if instruments.is_empty() {
            let body = html::paragraph(&format!(
                "No reference data is available for {}.",
                assets.join(", ")
            ));
            self.add_section("main-analysis", SectionKind::Text, body);
        } else {
            match report_type {
                ReportType::Single => self.single_report(&instruments, &metrics, timeframe),
                ReportType::Comparison => {
                    self.comparison_report(&instruments, &metrics, timeframe)
                }
                ReportType::Portfolio => self.portfolio_report(&instruments),
                ReportType::Sector => self.sector_report(&instruments),
                ReportType::Market => self.market_report(&instruments),
            }
        }

        self.changes.insert(
            0,
            format!("Created {} for {}", report_type.label(), assets.join(", ")),
        );

        StatePatch::Initial {
            report_type,
            assets: assets.clone(),
            timeframe: timeframe.to_string(),
            sections: self.plan.sections(),
        }
    }

    fn single_report(&mut self, instruments: &[&Instrument], metrics: &[String], timeframe: &str) {
        let mut body = String::new();
        for inst in instruments {
            body.push_str(&html::heading(&format!("{} ({})", inst.name, inst.symbol)));
            body.push_str(&html::paragraph(&describe(inst)));
            let rows: Vec<Vec<String>> = metrics
                .iter()
                .filter_map(|m| metric_cell(inst, m))
                .map(|cell| vec![cell.label.to_string(), cell.display])
                .collect();
            body.push_str(&html::table(&["Metric", "Value"], &rows));
        }
        self.add_section("main-analysis", SectionKind::Text, body);

        if let Some(chart) = self.price_chart(instruments, timeframe) {
            self.add_section("price-performance", SectionKind::Chart, chart);
            self.changes
                .push(format!("Charted closing prices over {timeframe}"));
        }
    }

    fn comparison_report(
        &mut self,
        instruments: &[&Instrument],
        metrics: &[String],
        timeframe: &str,
    ) {
        let mut body = comparison_matrix(instruments, metrics);
        if let Some(leader) = instruments
            .iter()
            .max_by(|a, b| a.change_pct.total_cmp(&b.change_pct))
        {
            body.push_str(&html::callout(
                "positive",
                &format!(
                    "{} leads the group on the session at {}.",
                    leader.symbol,
                    html::pct(leader.change_pct)
                ),
            ));
        }
        self.add_section("main-analysis", SectionKind::Table, body);

        let mut series = BTreeMap::new();
        for inst in instruments {
            let points = self.record_series(inst, timeframe);
            series.insert(inst.symbol.clone(), market::rebase(&points));
        }
        let chart = html::chart(
            "line",
            &format!("Performance rebased to 100, {timeframe}"),
            &series,
        );
        self.add_section("relative-performance", SectionKind::Chart, chart);
    }

    fn portfolio_report(&mut self, instruments: &[&Instrument]) {
        let weight = 100.0 / instruments.len() as f64;

        let rows: Vec<Vec<String>> = instruments
            .iter()
            .map(|inst| {
                vec![
                    inst.symbol.clone(),
                    inst.name.clone(),
                    inst.sector.clone(),
                    format!("{weight:.1}%"),
                    html::money(inst.price),
                    html::pct(inst.change_pct),
                    html::pct(weight * inst.change_pct / 100.0),
                ]
            })
            .collect();
        let body = html::table(
            &["Symbol", "Name", "Sector", "Weight", "Price", "Day change", "Contribution"],
            &rows,
        );
        self.add_section("main-analysis", SectionKind::Table, body);

        let mut allocation: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for inst in instruments {
            let slot = allocation.entry(inst.sector.clone()).or_insert_with(|| vec![0.0]);
            slot[0] = market::round2(slot[0] + weight);
        }
        let chart = html::chart("pie", "Sector allocation, equal weight", &allocation);
        self.add_section("allocation-breakdown", SectionKind::Chart, chart);

        let n = instruments.len() as f64;
        let beta = instruments.iter().map(|i| i.beta).sum::<f64>() / n;
        let pe = instruments.iter().map(|i| i.pe).sum::<f64>() / n;
        let dividend = instruments.iter().map(|i| i.dividend_yield).sum::<f64>() / n;
        let day = instruments.iter().map(|i| i.change_pct).sum::<f64>() / n;
        self.compute("PORTFOLIO", "beta", market::round2(beta));
        self.compute("PORTFOLIO", "day_change", market::round2(day));

        let cards = vec![
            ("Holdings".to_string(), instruments.len().to_string()),
            ("Weighted beta".to_string(), html::number(beta)),
            ("Average P/E".to_string(), format!("{pe:.1}x")),
            ("Weighted yield".to_string(), format!("{dividend:.2}%")),
            ("Day change".to_string(), html::pct(day)),
        ];
        self.add_section(
            "portfolio-metrics",
            SectionKind::Metric,
            html::metric_cards(&cards),
        );
    }

    fn sector_report(&mut self, instruments: &[&Instrument]) {
        let mut by_sector: BTreeMap<&str, Vec<&Instrument>> = BTreeMap::new();
        for &inst in instruments {
            by_sector.entry(inst.sector.as_str()).or_default().push(inst);
        }

        let mut body = String::new();
        for (sector, members) in &by_sector {
            let average =
                members.iter().map(|i| i.change_pct).sum::<f64>() / members.len() as f64;
            body.push_str(&html::heading(sector));
            body.push_str(&html::paragraph(&format!(
                "{} constituents, average session move {}.",
                members.len(),
                html::pct(average)
            )));
            let rows: Vec<Vec<String>> = members
                .iter()
                .map(|inst| {
                    vec![
                        inst.symbol.clone(),
                        inst.name.clone(),
                        html::money(inst.price),
                        html::pct(inst.change_pct),
                        format!("{:.1}x", inst.pe),
                        html::cap(inst.market_cap),
                    ]
                })
                .collect();
            body.push_str(&html::table(
                &["Symbol", "Name", "Price", "Day change", "P/E", "Market cap"],
                &rows,
            ));
        }
        self.add_section("main-analysis", SectionKind::Table, body);

        let leader = instruments
            .iter()
            .max_by(|a, b| a.change_pct.total_cmp(&b.change_pct));
        let laggard = instruments
            .iter()
            .min_by(|a, b| a.change_pct.total_cmp(&b.change_pct));
        if let (Some(leader), Some(laggard)) = (leader, laggard) {
            let mut body = html::callout(
                "positive",
                &format!("Leader: {} at {}.", leader.symbol, html::pct(leader.change_pct)),
            );
            body.push_str(&html::callout(
                "negative",
                &format!("Laggard: {} at {}.", laggard.symbol, html::pct(laggard.change_pct)),
            ));
            self.add_section("sector-leaders", SectionKind::Insight, body);
        }
    }

    fn market_report(&mut self, instruments: &[&Instrument]) {
        let rows: Vec<Vec<String>> = instruments
            .iter()
            .map(|inst| {
                vec![
                    inst.symbol.clone(),
                    inst.name.clone(),
                    html::money(inst.price),
                    html::pct(inst.change_pct),
                    format!(
                        "{} to {}",
                        html::money(inst.low_52w),
                        html::money(inst.high_52w)
                    ),
                ]
            })
            .collect();
        let body = html::table(
            &["Symbol", "Name", "Level", "Day change", "52-week range"],
            &rows,
        );
        self.add_section("main-analysis", SectionKind::Table, body);

        let reference = self.reference;
        let universe: Vec<&Instrument> = reference
            .symbols()
            .into_iter()
            .filter_map(|s| reference.lookup(s))
            .collect();
        if universe.is_empty() {
            return;
        }
        let advancers = universe.iter().filter(|i| i.change_pct > 0.0).count();
        let decliners = universe.iter().filter(|i| i.change_pct < 0.0).count();
        let average = universe.iter().map(|i| i.change_pct).sum::<f64>() / universe.len() as f64;
        self.compute("MARKET", "advancers", advancers as f64);
        self.compute("MARKET", "decliners", decliners as f64);

        let cards = vec![
            ("Advancers".to_string(), advancers.to_string()),
            ("Decliners".to_string(), decliners.to_string()),
            ("Average move".to_string(), html::pct(average)),
        ];
        let mut body = html::metric_cards(&cards);
        let tone = if advancers >= decliners { "positive" } else { "negative" };
        body.push_str(&html::callout(
            tone,
            &format!(
                "Breadth is {} with {advancers} of {} tracked instruments higher on the session.",
                if advancers >= decliners { "constructive" } else { "weak" },
                universe.len()
            ),
        ));
        self.add_section("market-breadth", SectionKind::Insight, body);
    }
}

/// Metric rows against one column per instrument.
pub(super) fn comparison_matrix(instruments: &[&Instrument], metrics: &[String]) -> String {
    let mut headers = vec!["Metric"];
    headers.extend(instruments.iter().map(|i| i.symbol.as_str()));

    let rows: Vec<Vec<String>> = metrics
        .iter()
        .filter_map(|metric| {
            let cells: Vec<_> = instruments
                .iter()
                .map(|inst| metric_cell(inst, metric))
                .collect();
            let label = cells.iter().flatten().next()?.label;
            let mut row = vec![label.to_string()];
            row.extend(
                cells
                    .into_iter()
                    .map(|c| c.map(|c| c.display).unwrap_or_else(|| "n/a".into())),
            );
            Some(row)
        })
        .collect();

    html::table(&headers, &rows)
}
